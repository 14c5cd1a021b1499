use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::{ListFilter, NewUser, Page, RepositoryError, UserRepository, UserUpdate};
use crate::entities::user;

/// sea-orm backed [`UserRepository`]
#[derive(Debug, Clone)]
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn create(&self, new_user: NewUser) -> Result<Uuid, RepositoryError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let model = user::ActiveModel {
            id: Set(id),
            name: Set(new_user.name),
            login: Set(new_user.login),
            password_hash: Set(new_user.password_hash),
            age: Set(new_user.age),
            created_at: Set(now),
            updated_at: Set(now),
        };

        user::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await?;

        Ok(id)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<user::Model, RepositoryError> {
        user::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn get_by_login(&self, login: &str) -> Result<user::Model, RepositoryError> {
        user::Entity::find()
            .filter(user::Column::Login.eq(login))
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn get_list(&self, filter: ListFilter) -> Result<Page<user::Model>, RepositoryError> {
        let mut query = user::Entity::find();

        if let Some(pattern) = filter.search_pattern() {
            query = query.filter(user::Column::Name.like(pattern));
        }

        if let Some(owner) = filter.owner {
            query = query.filter(user::Column::Id.eq(owner));
        }

        let count = query.clone().count(&self.db).await?;

        let items = query
            .order_by_asc(user::Column::CreatedAt)
            .offset(filter.offset)
            .limit(filter.limit)
            .all(&self.db)
            .await?;

        Ok(Page { count, items })
    }

    async fn update(&self, update: UserUpdate) -> Result<u64, RepositoryError> {
        let result = user::Entity::update_many()
            .col_expr(user::Column::Name, Expr::value(update.name))
            .col_expr(user::Column::Login, Expr::value(update.login))
            .col_expr(user::Column::PasswordHash, Expr::value(update.password_hash))
            .col_expr(user::Column::Age, Expr::value(update.age))
            .col_expr(user::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(user::Column::Id.eq(update.id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }

    async fn delete(&self, id: Uuid) -> Result<u64, RepositoryError> {
        let result = user::Entity::delete_many()
            .filter(user::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }
}

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::{ListFilter, NewPhone, Page, PhoneRepository, PhoneUpdate, RepositoryError};
use crate::entities::phone;

/// sea-orm backed [`PhoneRepository`]
#[derive(Debug, Clone)]
pub struct PhoneStore {
    db: DatabaseConnection,
}

impl PhoneStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PhoneRepository for PhoneStore {
    async fn create(&self, new_phone: NewPhone) -> Result<Uuid, RepositoryError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let model = phone::ActiveModel {
            id: Set(id),
            user_id: Set(new_phone.user_id),
            phone: Set(new_phone.phone),
            description: Set(new_phone.description),
            is_fax: Set(new_phone.is_fax),
            created_at: Set(now),
            updated_at: Set(now),
        };

        phone::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await?;

        Ok(id)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<phone::Model, RepositoryError> {
        phone::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn get_list(&self, filter: ListFilter) -> Result<Page<phone::Model>, RepositoryError> {
        let mut query = phone::Entity::find();

        if let Some(pattern) = filter.search_pattern() {
            query = query.filter(phone::Column::Phone.like(pattern));
        }

        if let Some(owner) = filter.owner {
            query = query.filter(phone::Column::UserId.eq(owner));
        }

        let count = query.clone().count(&self.db).await?;

        let items = query
            .order_by_asc(phone::Column::CreatedAt)
            .offset(filter.offset)
            .limit(filter.limit)
            .all(&self.db)
            .await?;

        Ok(Page { count, items })
    }

    async fn update(&self, update: PhoneUpdate) -> Result<u64, RepositoryError> {
        let result = phone::Entity::update_many()
            .col_expr(phone::Column::Phone, Expr::value(update.phone))
            .col_expr(phone::Column::Description, Expr::value(update.description))
            .col_expr(phone::Column::IsFax, Expr::value(update.is_fax))
            .col_expr(phone::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(phone::Column::Id.eq(update.id))
            .filter(phone::Column::UserId.eq(update.user_id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }

    async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<u64, RepositoryError> {
        let result = phone::Entity::delete_many()
            .filter(phone::Column::Id.eq(id))
            .filter(phone::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }
}

//! Initial schema: accounts and their phone numbers

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(uuid(User::Id).primary_key())
                    .col(string_len(User::Name, 255).not_null().default(""))
                    // The unique index is what serializes concurrent registrations
                    .col(string_len(User::Login, 255).not_null().unique_key())
                    .col(string_len(User::PasswordHash, 255).not_null())
                    .col(integer(User::Age).not_null().default(0))
                    .col(
                        timestamp_with_time_zone(User::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(User::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Phone::Table)
                    .if_not_exists()
                    .col(uuid(Phone::Id).primary_key())
                    .col(uuid(Phone::UserId).not_null())
                    .col(string_len(Phone::Phone, 32).not_null())
                    .col(text(Phone::Description).not_null().default(""))
                    .col(boolean(Phone::IsFax).not_null().default(false))
                    .col(
                        timestamp_with_time_zone(Phone::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Phone::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_phones_user_id")
                            .from(Phone::Table, Phone::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_phones_user_id")
                    .table(Phone::Table)
                    .col(Phone::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Phone::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum User {
    #[sea_orm(iden = "users")]
    Table,
    Id,
    Name,
    Login,
    PasswordHash,
    Age,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Phone {
    #[sea_orm(iden = "phones")]
    Table,
    Id,
    UserId,
    Phone,
    Description,
    IsFax,
    CreatedAt,
    UpdatedAt,
}

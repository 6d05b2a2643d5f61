use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Directors::Table)
                    .if_not_exists()
                    .col(pk_auto(Directors::Id))
                    .col(string(Directors::Name))
                    .col(string_null(Directors::Dob))
                    .col(text_null(Directors::Bio))
                    .col(string_null(Directors::Image))
                    .col(big_integer(Directors::CreatedAt))
                    .col(big_integer(Directors::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Directors::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Directors {
    Table,
    Id,
    Name,
    Dob,
    Bio,
    Image,
    CreatedAt,
    UpdatedAt,
}

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MemeTokens::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(MemeTokens::Id).big_unsigned().auto_increment().primary_key())
                    .col(ColumnDef::new(MemeTokens::UserId).string().not_null())
                    .col(ColumnDef::new(MemeTokens::Name).string().not_null())
                    .col(ColumnDef::new(MemeTokens::Symbol).string().not_null())
                    .col(ColumnDef::new(MemeTokens::ContractAddress).string().not_null())
                    .col(ColumnDef::new(MemeTokens::CreatedAt).timestamp().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .index(
                        Index::create()
                            .name("idx_user_contract")
                            .table(MemeTokens::Table)
                            .col(MemeTokens::UserId)
                            .col(MemeTokens::ContractAddress)
                            .unique()
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MemeTokens::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum MemeTokens {
    Table,
    Id,
    UserId,
    Name,
    Symbol,
    ContractAddress,
    CreatedAt,
}

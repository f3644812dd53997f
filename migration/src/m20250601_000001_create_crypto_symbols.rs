use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CryptoSymbols::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CryptoSymbols::Id).big_unsigned().auto_increment().primary_key())
                    .col(ColumnDef::new(CryptoSymbols::UserId).string().not_null())
                    .col(ColumnDef::new(CryptoSymbols::ListType).string().not_null()) // "mainstream" or "meme"
                    .col(ColumnDef::new(CryptoSymbols::Symbol).string().not_null())
                    .col(ColumnDef::new(CryptoSymbols::SortOrder).integer().not_null())
                    .col(ColumnDef::new(CryptoSymbols::CreatedAt).timestamp().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .index(
                        Index::create()
                            .name("idx_user_list_symbol")
                            .table(CryptoSymbols::Table)
                            .col(CryptoSymbols::UserId)
                            .col(CryptoSymbols::ListType)
                            .col(CryptoSymbols::Symbol)
                            .unique()
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CryptoSymbols::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CryptoSymbols {
    Table,
    Id,
    UserId,
    ListType,
    Symbol,
    SortOrder,
    CreatedAt,
}

//! `SeaORM` Entity, @generated manually

use sea_orm::entity::prelude::*;

/// Per-user tracked ticker symbols, one ordered list per list type
/// ("mainstream" or "meme"). (user_id, list_type, symbol) is unique.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "crypto_symbols")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: u64,
    pub user_id: String,
    pub list_type: String,
    pub symbol: String,
    pub sort_order: i32,
    pub created_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

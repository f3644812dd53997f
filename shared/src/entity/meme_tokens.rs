//! `SeaORM` Entity, @generated manually

use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Per-user watched meme tokens, keyed by contract address.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "meme_tokens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: u64,
    pub user_id: String,
    pub name: String,
    pub symbol: String,
    pub contract_address: String,
    pub created_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

//! Per-user watchlists: tracked ticker symbols and meme tokens.

use std::sync::Arc;

use sea_orm::prelude::*;
use sea_orm::{QueryOrder, Set};
use tracing::info;

use crate::entity::{crypto_symbols, meme_tokens};
use crate::error::{Error, Result};

/// Ordered, deduplicated list of ticker symbols a user tracks, one list per
/// list type ("mainstream" or "meme").
#[derive(Clone)]
pub struct SymbolRegistry {
    db: Arc<DatabaseConnection>,
}

impl SymbolRegistry {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Symbols for one user and list type, in insertion order.
    pub async fn list(&self, user_id: &str, list_type: &str) -> Result<Vec<String>> {
        let rows = crypto_symbols::Entity::find()
            .filter(crypto_symbols::Column::UserId.eq(user_id))
            .filter(crypto_symbols::Column::ListType.eq(list_type))
            .order_by_asc(crypto_symbols::Column::SortOrder)
            .all(self.db.as_ref())
            .await?;
        Ok(rows.into_iter().map(|row| row.symbol).collect())
    }

    /// Adds a symbol to the end of the list. The symbol is uppercased before
    /// it is stored, so "btc" and "BTC" are the same entry.
    pub async fn add(&self, user_id: &str, list_type: &str, symbol: &str) -> Result<()> {
        let symbol = normalize_symbol(symbol)?;

        let existing = crypto_symbols::Entity::find()
            .filter(crypto_symbols::Column::UserId.eq(user_id))
            .filter(crypto_symbols::Column::ListType.eq(list_type))
            .filter(crypto_symbols::Column::Symbol.eq(&symbol))
            .one(self.db.as_ref())
            .await?;
        if existing.is_some() {
            return Err(Error::Duplicate(symbol));
        }

        let last = crypto_symbols::Entity::find()
            .filter(crypto_symbols::Column::UserId.eq(user_id))
            .filter(crypto_symbols::Column::ListType.eq(list_type))
            .order_by_desc(crypto_symbols::Column::SortOrder)
            .one(self.db.as_ref())
            .await?;
        let sort_order = next_sort_order(last.map(|row| row.sort_order));

        let row = crypto_symbols::ActiveModel {
            user_id: Set(user_id.to_string()),
            list_type: Set(list_type.to_string()),
            symbol: Set(symbol.clone()),
            sort_order: Set(sort_order),
            ..Default::default()
        };
        crypto_symbols::Entity::insert(row).exec(self.db.as_ref()).await?;
        info!(user_id, list_type, symbol = %symbol, sort_order, "Symbol added");
        Ok(())
    }

    /// Removes a symbol. Idempotent: removing a symbol that is not tracked
    /// is not an error. The caller is responsible for evicting any cached
    /// candle data for the symbol.
    pub async fn remove(&self, user_id: &str, list_type: &str, symbol: &str) -> Result<()> {
        let symbol = symbol.trim().to_uppercase();
        crypto_symbols::Entity::delete_many()
            .filter(crypto_symbols::Column::UserId.eq(user_id))
            .filter(crypto_symbols::Column::ListType.eq(list_type))
            .filter(crypto_symbols::Column::Symbol.eq(&symbol))
            .exec(self.db.as_ref())
            .await?;
        info!(user_id, list_type, symbol = %symbol, "Symbol removed");
        Ok(())
    }
}

/// Meme tokens a user watches, newest first, keyed by contract address.
#[derive(Clone)]
pub struct TokenRegistry {
    db: Arc<DatabaseConnection>,
}

impl TokenRegistry {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<meme_tokens::Model>> {
        let rows = meme_tokens::Entity::find()
            .filter(meme_tokens::Column::UserId.eq(user_id))
            .order_by_desc(meme_tokens::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;
        Ok(rows)
    }

    pub async fn add(
        &self,
        user_id: &str,
        name: &str,
        symbol: &str,
        contract_address: &str,
    ) -> Result<()> {
        let contract_address = contract_address.trim();
        if contract_address.is_empty() {
            return Err(Error::Validation("contract address is empty".to_string()));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("token name is empty".to_string()));
        }

        let existing = meme_tokens::Entity::find()
            .filter(meme_tokens::Column::UserId.eq(user_id))
            .filter(meme_tokens::Column::ContractAddress.eq(contract_address))
            .one(self.db.as_ref())
            .await?;
        if existing.is_some() {
            return Err(Error::Duplicate(contract_address.to_string()));
        }

        let row = meme_tokens::ActiveModel {
            user_id: Set(user_id.to_string()),
            name: Set(name.to_string()),
            symbol: Set(symbol.trim().to_uppercase()),
            contract_address: Set(contract_address.to_string()),
            ..Default::default()
        };
        meme_tokens::Entity::insert(row).exec(self.db.as_ref()).await?;
        info!(user_id, contract_address, "Meme token added");
        Ok(())
    }

    pub async fn remove(&self, user_id: &str, contract_address: &str) -> Result<()> {
        meme_tokens::Entity::delete_many()
            .filter(meme_tokens::Column::UserId.eq(user_id))
            .filter(meme_tokens::Column::ContractAddress.eq(contract_address.trim()))
            .exec(self.db.as_ref())
            .await?;
        info!(user_id, contract_address, "Meme token removed");
        Ok(())
    }
}

fn normalize_symbol(raw: &str) -> Result<String> {
    let symbol = raw.trim();
    if symbol.is_empty() {
        return Err(Error::Validation("symbol is empty".to_string()));
    }
    Ok(symbol.to_uppercase())
}

fn next_sort_order(last: Option<i32>) -> i32 {
    last.map(|order| order + 1).unwrap_or(0)
}

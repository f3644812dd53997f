pub use sea_orm_migration::prelude::*;

mod m20250601_000001_create_crypto_symbols;
mod m20250601_000002_create_meme_tokens;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_crypto_symbols::Migration),
            Box::new(m20250601_000002_create_meme_tokens::Migration),
        ]
    }
}

pub mod crypto_symbols;
pub mod meme_tokens;

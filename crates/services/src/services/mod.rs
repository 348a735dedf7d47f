pub mod authored_text;
pub mod board;
pub mod campaign;
pub mod config;
pub mod database_validator;
pub mod mention_catalog;
pub mod mention_resolver;
pub mod mention_tokenizer;
pub mod mentions;
pub mod timeline;

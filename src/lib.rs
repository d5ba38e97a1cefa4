pub mod attachments;
pub mod commands;
pub mod config;
pub mod db;
pub mod llm;
pub mod pipeline;
pub mod share;
pub mod store;

use config::Config;
use db::Database;
use store::ResultStore;

/// Open the database under the configured data directory and load the result store.
pub fn open_store(config: &Config) -> rusqlite::Result<ResultStore> {
    Ok(ResultStore::open(Database::new(&config.data_dir)?))
}

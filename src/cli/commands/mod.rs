//! Command implementations

pub mod init;
pub mod list;
pub mod status;

use crate::cli::GlobalOpts;
use crate::core::{Config, SqliteFile};

/// Layered config with the global CLI flags applied on top
pub(crate) fn resolve_config(global: &GlobalOpts) -> Config {
    let mut config = Config::load();
    config.merge(Config {
        database: global.db.clone(),
        ..Default::default()
    });
    config
}

pub(crate) fn open_database(config: &Config) -> SqliteFile {
    let path = config.database_path();
    tracing::debug!(path = %path.display(), "using database");
    SqliteFile::new(path)
}

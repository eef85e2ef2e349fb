//! Core module - persistence engine and configuration

pub mod bootstrap;
pub mod classify;
pub mod config;
pub mod db;
pub mod error;
pub mod loader;
pub mod schema;
pub mod store;

pub use bootstrap::{bootstrap, BootstrapReport, Lifecycle};
pub use classify::{ClassificationPolicy, ClassificationReport, RandomPolicy};
pub use config::Config;
pub use db::{ConnectionProvider, SharedConnection, SqliteFile};
pub use error::StoreError;
pub use loader::{DataSource, DirectorySource, EmbeddedSource, LoadReport, MemorySource, SourceKind};
pub use store::RecordStore;

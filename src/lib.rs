// Meeting store - relational data access for meetings
//
// - database: SQLite schema, migrations, model descriptors and the
//   policy-restricted query helpers
// - config: store configuration
// - cli: the meeting-store command

// SQL logging macros - exported for use by other modules
#[macro_use]
pub mod macros;

pub mod cli;
pub mod config;
pub mod database;

pub use config::StoreConfig;
pub use database::{
    AttributePolicy, DatabaseManager, FindOptions, FindOrCreateOptions, IncludeSpec, Record, Repository,
    SharedDatabase,
};

/// Initialize env_logger to output to stderr (reads RUST_LOG env var)
pub fn init_logging(default_level: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .try_init();
}

// Command-line interface for the meeting store
// Inspect and migrate a store database.

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;

use crate::config::StoreConfig;
use crate::database::migrations::{self, MIGRATIONS};
use crate::database::{DatabaseManager, SchemaRegistry};

#[derive(Parser, Debug)]
#[command(name = "meeting-store")]
#[command(about = "Inspect and migrate a meeting store database")]
#[command(version)]
pub struct Cli {
    /// Path to a JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Database path override
    #[arg(short, long)]
    pub database: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the applied and pending migrations
    Status,
    /// Apply pending migrations
    Migrate {
        /// Stop at this version instead of the latest
        #[arg(long)]
        to: Option<i32>,
    },
    /// Revert migrations newer than a version
    Rollback {
        #[arg(long)]
        to: i32,
    },
    /// Print model attributes as JSON
    Schema {
        /// Only this model
        #[arg(long)]
        model: Option<String>,
    },
}

impl Cli {
    /// Effective configuration: file, environment, then command-line overrides
    pub fn store_config(&self) -> Result<StoreConfig> {
        let mut config = StoreConfig::load(self.config.as_deref())?;
        if let Some(database) = &self.database {
            config.database_path = database.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        Ok(config)
    }
}

/// Run a parsed command
pub fn run(cli: &Cli, config: &StoreConfig) -> Result<()> {
    match &cli.command {
        Commands::Status => {
            let conn = DatabaseManager::connect(config)?;
            let current = migrations::get_schema_version(&conn)?;
            println!("database: {}", config.database_path.display());
            println!("schema version: {} (latest {})", current, migrations::latest_version());
            for migration in MIGRATIONS {
                let state = if migration.version <= current { "applied" } else { "pending" };
                println!("  v{} {:<8} {}", migration.version, state, migration.name);
            }
        }
        Commands::Migrate { to } => {
            let conn = DatabaseManager::connect(config)?;
            let target = to.unwrap_or_else(migrations::latest_version);
            migrations::migrate_to(&conn, target)?;
            println!("schema version: {}", migrations::get_schema_version(&conn)?);
        }
        Commands::Rollback { to } => {
            let conn = DatabaseManager::connect(config)?;
            migrations::rollback_to(&conn, *to)?;
            println!("schema version: {}", migrations::get_schema_version(&conn)?);
        }
        Commands::Schema { model } => {
            let registry = SchemaRegistry::with_models()?;
            let output = schema_json(&registry, model.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

/// Index and non-index attributes of each model
pub fn schema_json(registry: &SchemaRegistry, model: Option<&str>) -> Result<serde_json::Value> {
    let schemas = match model {
        Some(name) => vec![registry.require(name)?],
        None => registry.schemas().collect(),
    };
    let mut output = serde_json::Map::new();
    for schema in schemas {
        output.insert(
            schema.name.to_string(),
            json!({
                "table": schema.table,
                "indexes": schema.get_indexes(),
                "nonIndexes": schema.get_non_indexes(),
            }),
        );
    }
    Ok(serde_json::Value::Object(output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_commands() {
        let cli = Cli::try_parse_from(["meeting-store", "migrate", "--to", "2"]).unwrap();
        assert!(matches!(cli.command, Commands::Migrate { to: Some(2) }));

        let cli = Cli::try_parse_from(["meeting-store", "-d", "/tmp/x.db", "schema", "--model", "User"]).unwrap();
        assert_eq!(cli.database, Some(PathBuf::from("/tmp/x.db")));
        assert!(matches!(cli.command, Commands::Schema { model: Some(ref m) } if m == "User"));

        assert!(Cli::try_parse_from(["meeting-store", "rollback"]).is_err());
    }

    #[test]
    fn test_schema_json() {
        let registry = SchemaRegistry::with_models().unwrap();
        let output = schema_json(&registry, Some("User")).unwrap();
        assert_eq!(output["User"]["indexes"], json!(["userId"]));
        assert_eq!(output["User"]["nonIndexes"], json!(["email", "password"]));

        let all = schema_json(&registry, None).unwrap();
        assert_eq!(all.as_object().unwrap().len(), 8);
        assert!(schema_json(&registry, Some("Recording")).is_err());
    }

    #[test]
    fn test_migrate_and_rollback() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("cli.db");
        let path = db.to_str().unwrap();

        let cli = Cli::try_parse_from(["meeting-store", "-d", path, "migrate", "--to", "3"]).unwrap();
        let config = cli.store_config().unwrap();
        run(&cli, &config).unwrap();
        let conn = DatabaseManager::connect(&config).unwrap();
        assert_eq!(migrations::get_schema_version(&conn).unwrap(), 3);

        let cli = Cli::try_parse_from(["meeting-store", "-d", path, "rollback", "--to", "1"]).unwrap();
        run(&cli, &config).unwrap();
        assert_eq!(migrations::get_schema_version(&conn).unwrap(), 1);
    }
}

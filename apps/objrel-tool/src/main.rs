//! CLI tool for schema management and data inspection.
//!
//! Provides commands for:
//! - Compiling a declared root type into tables (or printing the DDL)
//! - Importing JSON values into a root table
//! - Dumping a root table as JSON

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use objrel_core::json::{from_json, to_json};
use objrel_core::schema::SchemaCompiler;
use objrel_core::types::{DeclarationParser, TypeDescriptor};
use objrel_core::{Database, EngineConfig};

/// Command-line arguments for the tool.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding the configuration
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile the root type's tables
    Schema {
        #[command(flatten)]
        target: Target,

        /// Print the DDL without touching the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Insert JSON values (one object or an array of objects)
    Insert {
        #[command(flatten)]
        target: Target,

        /// JSON input file; reads stdin when omitted
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Print every stored value as a JSON array
    Dump {
        #[command(flatten)]
        target: Target,
    },
}

/// Root type and table a command works on.
#[derive(Args, Debug)]
struct Target {
    /// Type declaration file (TOML)
    #[arg(long)]
    types: PathBuf,

    /// Root record type name
    #[arg(long)]
    root: String,

    /// Root table name
    #[arg(long)]
    table: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let config = load_config(cli.config.as_deref(), cli.db)?;

    match cli.command {
        Command::Schema { target, dry_run } => {
            if dry_run {
                let descriptor = resolve(&Database::in_memory()?, &target)?;
                let plan = SchemaCompiler::plan(&descriptor, &target.table)?;
                for statement in plan.ddl() {
                    println!("{};", statement);
                }
                return Ok(());
            }
            let db = Database::open(config)?;
            let descriptor = resolve(&db, &target)?;
            let plan = db.compile(&descriptor, &target.table)?;
            for table in &plan.tables {
                let columns: Vec<&str> = table.columns().map(|c| c.name.as_str()).collect();
                println!("{} ({})", table.name, columns.join(", "));
            }
        }
        Command::Insert { target, input } => {
            let db = Database::open(config)?;
            let descriptor = resolve(&db, &target)?;
            db.compile(&descriptor, &target.table)?;

            let text = read_input(input.as_deref())?;
            let json: serde_json::Value =
                serde_json::from_str(&text).context("input is not valid JSON")?;
            let items = match json {
                serde_json::Value::Array(items) => items,
                other => vec![other],
            };
            for (i, item) in items.iter().enumerate() {
                let value = from_json(&descriptor, item)
                    .with_context(|| format!("item {} does not match {}", i, target.root))?;
                match db.insert_value(&descriptor, &target.table, &value)? {
                    Some(id) => println!("{}", id),
                    None => println!("inserted"),
                }
            }
            tracing::info!("Inserted {} value(s) into '{}'", items.len(), target.table);
        }
        Command::Dump { target } => {
            let db = Database::open(config)?;
            let descriptor = resolve(&db, &target)?;
            let values = db.get_all_values(&descriptor, &target.table)?;
            let json = values
                .iter()
                .map(|value| to_json(&descriptor, value))
                .collect::<objrel_core::Result<Vec<_>>>()?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>, db: Option<PathBuf>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    config.apply_env_overrides()?;
    if let Some(db) = db {
        config.database_path = db;
    }
    Ok(config)
}

/// Loads the declaration file into the database's registry and resolves the
/// root type.
fn resolve(db: &Database, target: &Target) -> Result<Arc<TypeDescriptor>> {
    let text = fs::read_to_string(&target.types)
        .with_context(|| format!("failed to read {}", target.types.display()))?;
    let count = DeclarationParser::load_into(db.type_registry(), &text)?;
    tracing::debug!("Loaded {} declaration(s) from {}", count, target.types.display());
    if !db.type_registry().contains(&target.root) {
        bail!(
            "type '{}' is not declared in {} (declared: {})",
            target.root,
            target.types.display(),
            db.type_registry().type_names().join(", ")
        );
    }
    Ok(db.type_registry().resolve_named(&target.root)?)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
        }
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

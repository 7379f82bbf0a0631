//! Schema Catalog CLI
//!
//! Loads the configured schema catalog and reports its history.
//!
//! Usage:
//!   schema-catalog load --json
//!   schema-catalog changes --breaking
//!   schema-catalog lifecycle User --field email

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use graphql_catalog::{
    Catalog, CatalogConfig, CriticalityLevel, LoadEnv, LoadedCatalog, Loader, SchemaLifecycle, SchemaRef,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-catalog")]
#[command(about = "Load GraphQL schema catalogs and inspect their history")]
struct Cli {
    /// Config file layered over catalog.toml and CATALOG__* variables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Project root (overrides schema.root)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Bypass the introspection cache
    #[arg(long)]
    fresh: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the catalog and print a summary
    Load {
        /// Print the whole catalog as JSON
        #[arg(long)]
        json: bool,
    },

    /// List revisions and their changes, newest first
    Changes {
        /// Only show breaking changes
        #[arg(long)]
        breaking: bool,
    },

    /// Show when a type or field was added and removed
    Lifecycle {
        /// Type name
        type_name: String,
        /// Field of that type
        #[arg(short, long)]
        field: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = CatalogConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    if let Some(root) = cli.root {
        config.schema.root = root;
    }

    let loader = Loader::default();
    let env = LoadEnv::os();
    let loaded = if cli.fresh { loader.load_fresh(&config, &env)? } else { loader.load(&config, &env)? };
    for diagnostic in &loaded.diagnostics {
        eprintln!("⚠️  {}", diagnostic);
    }
    let Some(catalog) = loaded.data.as_ref() else {
        println!("Schema loading is disabled");
        return Ok(());
    };

    match cli.command {
        Commands::Load { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&loaded)?);
            } else {
                print_summary(&loaded, catalog);
            }
        }
        Commands::Changes { breaking } => print_changes(catalog, breaking),
        Commands::Lifecycle { type_name, field } => {
            let lifecycle = SchemaLifecycle::from_catalog(catalog)?;
            print_lifecycle(&lifecycle, &type_name, field.as_deref())?;
        }
    }
    Ok(())
}

fn print_summary(loaded: &LoadedCatalog, catalog: &Catalog) {
    println!("📂 Source: {}", loaded.source.as_deref().unwrap_or("-"));
    println!("   Kind:   {}", if catalog.is_versioned() { "versioned" } else { "unversioned" });
    for schema in catalog.schemas() {
        let label = schema.version().map(|v| v.to_string()).unwrap_or_else(|| "(unversioned)".to_string());
        println!(
            "   {} - {} types, {} revisions, {} categories",
            label,
            schema.definition().types.len(),
            schema.revisions().len(),
            schema.categories().len()
        );
    }
}

fn print_changes(catalog: &Catalog, breaking_only: bool) {
    for schema in catalog.schemas() {
        print_schema_changes(schema, breaking_only);
    }
}

fn print_schema_changes(schema: SchemaRef<'_>, breaking_only: bool) {
    if let Some(version) = schema.version() {
        println!("═══ {} ═══", version);
    }
    for revision in schema.revisions() {
        println!("📅 {} ({} changes)", revision.date, revision.changes.len());
        for change in revision.changes.iter().filter(|c| !breaking_only || c.is_breaking()) {
            let marker = match change.criticality.level {
                CriticalityLevel::Breaking => "🔴",
                CriticalityLevel::Dangerous => "🟡",
                CriticalityLevel::NonBreaking => "🟢",
            };
            println!("   {} {} {}", marker, change.kind, change.message);
        }
    }
}

fn print_lifecycle(lifecycle: &SchemaLifecycle, type_name: &str, field: Option<&str>) -> anyhow::Result<()> {
    let (label, available, added, removed) = match field {
        Some(field) => {
            if lifecycle.get_field(type_name, field).is_none() {
                bail!("no lifecycle recorded for {}.{}", type_name, field);
            }
            (
                format!("{}.{}", type_name, field),
                lifecycle.is_field_currently_available(type_name, field),
                lifecycle.field_added_date(type_name, field),
                lifecycle.field_removed_date(type_name, field),
            )
        }
        None => {
            if lifecycle.get_type(type_name).is_none() {
                bail!("no lifecycle recorded for type {}", type_name);
            }
            (
                type_name.to_string(),
                lifecycle.is_type_currently_available(type_name),
                lifecycle.type_added_date(type_name),
                lifecycle.type_removed_date(type_name),
            )
        }
    };
    println!("{} {}", if available { "✅" } else { "❌" }, label);
    println!("   Added:   {}", added.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()));
    println!("   Removed: {}", removed.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()));
    Ok(())
}

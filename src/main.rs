//! docbridge command-line tool
//!
//! Loads JSON fixtures into an in-memory document store and runs query or
//! mutation descriptors against them.
//!
//! Usage: docbridge [OPTIONS] <COMMAND>
//!
//! Commands:
//!   query    Print each decoded row as a JSON line
//!   count    Print the number of matching rows
//!   explain  Print the compiled native query
//!   insert   Insert a row and print the resulting collection
//!   update   Update matching rows and print the resulting collection
//!   delete   Delete matching rows and print the resulting collection

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use docbridge::{
    CompilerConfig, DeleteDescriptor, InMemoryStore, InsertDescriptor, QueryCompiler,
    QueryDescriptor, QueryOutput, ResultType, UpdateDescriptor,
};
use serde::de::DeserializeOwned;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "docbridge")]
#[command(about = "Run relational query descriptors against a document store", long_about = None)]
struct Args {
    /// Directory holding docbridge.toml and .env
    #[arg(short, long, default_value = ".")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print each decoded row as a JSON line
    Query {
        /// JSON object mapping collection names to document arrays
        #[arg(short, long)]
        fixtures: PathBuf,
        /// Query descriptor (JSON)
        #[arg(short, long)]
        query: PathBuf,
    },
    /// Print the number of matching rows
    Count {
        #[arg(short, long)]
        fixtures: PathBuf,
        #[arg(short, long)]
        query: PathBuf,
    },
    /// Print the compiled native query
    Explain {
        #[arg(short, long)]
        query: PathBuf,
    },
    /// Insert a row and print the resulting collection
    Insert {
        #[arg(short, long)]
        fixtures: PathBuf,
        /// Insert descriptor (JSON)
        #[arg(short, long)]
        descriptor: PathBuf,
    },
    /// Update matching rows and print the resulting collection
    Update {
        #[arg(short, long)]
        fixtures: PathBuf,
        /// Update descriptor (JSON)
        #[arg(short, long)]
        descriptor: PathBuf,
    },
    /// Delete matching rows and print the resulting collection
    Delete {
        #[arg(short, long)]
        fixtures: PathBuf,
        /// Delete descriptor (JSON)
        #[arg(short, long)]
        descriptor: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docbridge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = CompilerConfig::load(&args.config_dir)
        .with_context(|| format!("loading config from {}", args.config_dir.display()))?;
    tracing::debug!(
        "id column '{}', conflict policy '{}'",
        config.id_column,
        config.conflict_policy
    );

    match args.command {
        Command::Query { fixtures, query } => {
            let store = load_fixtures(&fixtures)?;
            let query: QueryDescriptor = read_json(&query)?;
            let compiler = QueryCompiler::with_config(&store, config);
            match compiler.execute(&query, ResultType::Multi)? {
                QueryOutput::Rows(rows) => {
                    for row in rows {
                        println!("{}", serde_json::to_string(&row?)?);
                    }
                }
                QueryOutput::Single(row) => println!("{}", serde_json::to_string(&row)?),
                QueryOutput::Multi(rows) => {
                    for row in rows {
                        println!("{}", serde_json::to_string(&row)?);
                    }
                }
            }
        }
        Command::Count { fixtures, query } => {
            let store = load_fixtures(&fixtures)?;
            let query: QueryDescriptor = read_json(&query)?;
            let compiler = QueryCompiler::with_config(&store, config);
            println!("{}", compiler.get_count(&query)?);
        }
        Command::Explain { query } => {
            let store = InMemoryStore::new();
            let query: QueryDescriptor = read_json(&query)?;
            let compiler = QueryCompiler::with_config(&store, config);
            let compiled = compiler.compile(&query)?;
            println!("{}", serde_json::to_string_pretty(&compiled)?);
        }
        Command::Insert {
            fixtures,
            descriptor,
        } => {
            let store = load_fixtures(&fixtures)?;
            let insert: InsertDescriptor = read_json(&descriptor)?;
            let id = QueryCompiler::with_config(&store, config).insert(&insert)?;
            tracing::info!("Inserted '{}' into '{}'", id, insert.collection);
            print_collection(&store, &insert.collection)?;
        }
        Command::Update {
            fixtures,
            descriptor,
        } => {
            let store = load_fixtures(&fixtures)?;
            let update: UpdateDescriptor = read_json(&descriptor)?;
            let matched = QueryCompiler::with_config(&store, config).update(&update)?;
            tracing::info!("Updated {} document(s) in '{}'", matched, update.collection);
            print_collection(&store, &update.collection)?;
        }
        Command::Delete {
            fixtures,
            descriptor,
        } => {
            let store = load_fixtures(&fixtures)?;
            let delete: DeleteDescriptor = read_json(&descriptor)?;
            let removed = QueryCompiler::with_config(&store, config).delete(&delete)?;
            tracing::info!("Removed {} document(s) from '{}'", removed, delete.collection);
            print_collection(&store, &delete.collection)?;
        }
    }

    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn load_fixtures(path: &Path) -> anyhow::Result<InMemoryStore> {
    let fixtures: serde_json::Value = read_json(path)?;
    let store = InMemoryStore::from_fixtures(&fixtures)?;
    tracing::debug!(
        "Loaded fixtures for collections {:?}",
        store.list_collections()
    );
    Ok(store)
}

fn print_collection(store: &InMemoryStore, collection: &str) -> anyhow::Result<()> {
    let docs = store.documents(collection);
    println!("{}", serde_json::to_string_pretty(&docs)?);
    Ok(())
}

//! sql2doc CLI
//!
//! Runs a YAML query file against JSON-lines collections held in memory,
//! or prints the MongoDB command it translates to.

use anyhow::Context;
use clap::Parser;
use sql2doc_builder::{PermissiveDateParser, QueryBuilder};
use sql2doc_cli::{logging, query, Config, QueryFile};
use sql2doc_memstore::MemStore;
use sql2doc_mongo::MongoEncoder;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "sql2doc", version, about = "Translate SQL-like queries into document store requests")]
struct Args {
    /// Query file (YAML)
    query: PathBuf,

    /// Configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding <collection>.jsonl files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Print the MongoDB command instead of executing
    #[arg(long)]
    explain: bool,
}

fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::from_env(),
    };
    if let Some(dir) = &args.data_dir {
        config.store.data_dir = dir.display().to_string();
    }

    logging::init(&config.logging);

    let query_file = QueryFile::load(&args.query)
        .with_context(|| format!("loading query {}", args.query.display()))?;

    let mut store = MemStore::new();
    if !args.explain && !query_file.from.is_empty() {
        let path = Path::new(&config.store.data_dir).join(format!("{}.jsonl", query_file.from));
        if path.exists() {
            store
                .load_file(&query_file.from, &path)
                .with_context(|| format!("loading collection {}", path.display()))?;
        } else {
            warn!(path = %path.display(), "collection file not found; querying an empty collection");
        }
    }

    let dates = PermissiveDateParser::with_formats(config.dates.extra_formats.iter().cloned());
    let builder = query_file.apply(QueryBuilder::new(&store)?.with_date_parser(dates))?;

    for ignored in builder.ignored() {
        warn!(?ignored, "query setting ignored");
    }

    if args.explain {
        let translation = builder.plan();
        for dropped in &translation.dropped {
            warn!(field = %dropped.field, op = %dropped.op, reason = ?dropped.reason, "predicate not expressible");
        }
        let command = MongoEncoder::new().encode_pretty(&translation.plan)?;
        println!("{}", command.unwrap_or_else(|| "null".to_string()));
        return Ok(());
    }

    info!(query = %args.query.display(), "executing");
    let output = query::run(&builder)?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

mod prepare;

use anyhow::Result;
use clap::{Parser, Subcommand};
use reelrank_core::{load_catalog, EngineConfig, QueryLog, QueryRequest, Recommender};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "reelrank-indexer")]
#[command(about = "Prepare catalog snapshots, run offline queries, inspect the query log", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean raw JSON/JSONL exports into a catalog snapshot (JSON Lines)
    Prepare {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output catalog file
        #[arg(long)]
        output: String,
        /// Min-max scale popularity and vote average to [0, 1]
        #[arg(long, default_value_t = false)]
        normalize: bool,
    },
    /// Rank a catalog for one query, replaying a query log first if given
    Query {
        #[arg(long)]
        catalog: String,
        #[arg(long)]
        log_dir: Option<String>,
        #[arg(long)]
        config: Option<String>,
        #[arg(long)]
        text: String,
        #[arg(long)]
        age: Option<u32>,
        #[arg(long)]
        gender: Option<String>,
        #[arg(long)]
        country: Option<String>,
        /// Preferred genre; repeatable
        #[arg(long = "genre")]
        genres: Vec<String>,
        #[arg(short, long, default_value_t = 5)]
        k: usize,
    },
    /// Print every query log entry as JSON
    Log {
        #[arg(long)]
        log_dir: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Prepare { input, output, normalize } => prepare_catalog(&input, &output, normalize),
        Commands::Query { catalog, log_dir, config, text, age, gender, country, genres, k } => {
            let request = QueryRequest { text, count: k, age, genre_preferences: genres, gender, country };
            run_query(&catalog, log_dir.as_deref(), config.as_deref(), &request)
        }
        Commands::Log { log_dir } => dump_log(&log_dir),
    }
}

fn prepare_catalog(input: &str, output: &str, normalize: bool) -> Result<()> {
    let mut rows = Vec::new();
    for file in prepare::collect_files(Path::new(input)) {
        let before = rows.len();
        rows.extend(prepare::read_raw(&file)?);
        tracing::debug!(file = %file.display(), rows = rows.len() - before, "read raw export");
    }
    let (records, stats) = prepare::clean(rows, normalize);

    if let Some(dir) = Path::new(output).parent() {
        fs::create_dir_all(dir)?;
    }
    let mut out = BufWriter::new(File::create(output)?);
    for rec in &records {
        serde_json::to_writer(&mut out, rec)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    tracing::info!(
        read = stats.read,
        dropped_incomplete = stats.dropped_incomplete,
        dropped_duplicate = stats.dropped_duplicate,
        written = stats.written,
        output,
        "catalog prepared"
    );
    Ok(())
}

fn run_query(catalog: &str, log_dir: Option<&str>, config: Option<&str>, request: &QueryRequest) -> Result<()> {
    let mut config = match config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    // Offline queries read the log but never add to it
    config.log_recommendations = false;
    let log = match log_dir {
        Some(dir) => QueryLog::open(dir)?,
        None => QueryLog::temporary()?,
    };
    let engine = Recommender::initialize(load_catalog(catalog)?, log, config)?;

    let results = engine.recommend(request);
    if results.is_empty() {
        println!("no eligible items");
    }
    for (rank, r) in results.iter().enumerate() {
        println!(
            "{:>2}. {:<40} score={:.4} similarity={:.4} popularity={:.2} [{}]",
            rank + 1,
            r.title,
            r.score,
            r.similarity,
            r.popularity,
            r.genres.join(", ")
        );
    }
    Ok(())
}

fn dump_log(log_dir: &str) -> Result<()> {
    let log = QueryLog::open(log_dir)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut malformed = 0usize;
    for record in log.iter() {
        match record? {
            Ok(entry) => {
                serde_json::to_writer(&mut out, &entry)?;
                out.write_all(b"\n")?;
            }
            Err(bad) => {
                malformed += 1;
                tracing::warn!(%bad, "malformed entry");
            }
        }
    }
    tracing::info!(entries = log.len(), malformed, "query log dumped");
    Ok(())
}

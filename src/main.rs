//! goshelf: a 19x19 Go game-record corpus builder and next-move lookup tool.
//!
//! ## Usage
//!
//! - `goshelf ingest --corpus <dir> --store <file>` - parse every `.sgf` file
//!   under `dir`, validate and replay each, and merge the result into `file`
//! - `goshelf query --store <file> --moves pd,dp,pp [--year-min Y] [--year-max Y]`
//!   - show recorded continuations from the position reached by playing the
//!   given moves, optionally restricted to an inclusive year range

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use goshelf::config::{IngestConfig, QueryConfig};
use goshelf::coord::{Alpha, Cart};
use goshelf::ingest::{Ingestor, VecRecordSource};
use goshelf::query::Query;
use goshelf::record::RawRecord;
use goshelf::store::memory::MemoryStore;

#[derive(Parser)]
#[command(name = "goshelf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest every `.sgf` record under a directory into a store snapshot.
    Ingest {
        #[arg(long)]
        corpus: PathBuf,
        #[arg(long)]
        store: PathBuf,
        #[arg(long, default_value_t = 1000)]
        batch_size: usize,
    },
    /// Look up recorded continuations from a position.
    Query {
        #[arg(long)]
        store: PathBuf,
        /// Comma-separated two-letter move tokens, e.g. `pd,dp,pp`.
        #[arg(long, default_value = "")]
        moves: String,
        /// Restrict to games played in or after this year.
        #[arg(long)]
        year_min: Option<i32>,
        /// Restrict to games played in or before this year.
        #[arg(long)]
        year_max: Option<i32>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest {
            corpus,
            store,
            batch_size,
        } => run_ingest(&corpus, &store, batch_size),
        Commands::Query {
            store,
            moves,
            year_min,
            year_max,
        } => run_query(&store, &moves, year_min, year_max),
    }
}

fn run_ingest(corpus: &PathBuf, store_path: &PathBuf, batch_size: usize) -> Result<()> {
    let records = load_sgf_records(corpus)?;
    log::info!("found {} candidate records under {corpus:?}", records.len());

    let store = if store_path.exists() {
        MemoryStore::load_from_file(store_path).context("loading existing store snapshot")?
    } else {
        MemoryStore::new()
    };

    let config = IngestConfig {
        batch_size,
        ..IngestConfig::default()
    };
    let ingestor = Ingestor::new(&store, config);
    let mut source = VecRecordSource::new(records);
    let tally = ingestor.run(&mut source).context("ingesting records")?;

    store
        .save_to_file(store_path)
        .context("saving store snapshot")?;
    println!(
        "added {}, exceptional {}, rejected {}, duplicates {}",
        tally.added, tally.exceptional, tally.rejected, tally.duplicates
    );
    Ok(())
}

fn run_query(
    store_path: &PathBuf,
    moves_arg: &str,
    year_min: Option<i32>,
    year_max: Option<i32>,
) -> Result<()> {
    let store = MemoryStore::load_from_file(store_path).context("loading store snapshot")?;
    let query = Query::with_config(
        &store,
        QueryConfig {
            year_min,
            year_max,
            ..QueryConfig::default()
        },
    );

    let moves: Vec<Cart> = moves_arg
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|tok| Alpha::parse(tok).to_cart())
        .collect();

    let ranked = query.next_moves(&moves).context("looking up next moves")?;
    if ranked.is_empty() {
        println!("no recorded continuations");
        return Ok(());
    }
    for candidate in ranked {
        match candidate.coord {
            Some(c) => println!("{} ({} games)", c.to_alpha(), candidate.count),
            None => println!("pass ({} games)", candidate.count),
        }
    }
    Ok(())
}

/// Scans `dir` for `.sgf` files and extracts each one's tags into a
/// `RawRecord` via a small bracketed-tag reader (`;KEY[value]`). A real
/// archive reader (tar, zip, a database dump) would implement
/// `goshelf::ingest::RecordSource` directly instead of building this
/// intermediate `Vec`.
fn load_sgf_records(dir: &PathBuf) -> Result<Vec<RawRecord>> {
    let mut records = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {dir:?}"))? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("sgf") {
            continue;
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {path:?}"))?;
        records.push(parse_sgf(&text));
    }
    Ok(records)
}

fn parse_sgf(text: &str) -> RawRecord {
    let tag = |key: &str| -> Option<String> {
        let needle = format!("{key}[");
        let start = text.find(&needle)? + needle.len();
        let end = text[start..].find(']')? + start;
        Some(text[start..end].to_string())
    };

    let moves = {
        let re = regex::Regex::new(r";[BW]\[([a-t]{2})\]").unwrap();
        re.captures_iter(text)
            .map(|c| c[1].to_string())
            .collect()
    };

    RawRecord {
        board_size: tag("SZ"),
        handicap: tag("HA"),
        black_name: tag("PB"),
        white_name: tag("PW"),
        black_rank: tag("BR"),
        white_rank: tag("WR"),
        event: tag("EV"),
        round: tag("RO"),
        date: tag("DT"),
        place: tag("PC"),
        komi: tag("KM"),
        result: tag("RE"),
        moves,
    }
}

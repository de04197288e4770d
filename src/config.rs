//! Tunable knobs for ingestion and querying.
//!
//! Grounded in `examples/kraktus-helpmate-tb`'s CLI argument structs (its
//! generation command takes an explicit worker count and progress cadence
//! rather than hardcoding them), adapted to this crate's own defaults.

/// Settings for one [`crate::ingest::Ingestor`] run.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// How many records make up one batch-level transaction.
    pub batch_size: usize,
    /// How many worker threads parse and validate records concurrently.
    pub worker_count: usize,
    /// Log a progress line every this many records processed.
    pub progress_interval: usize,
    /// How many plies of each game are replayed into position rows. Kept in
    /// lockstep with `QueryConfig::ply_depth` so every query depth the
    /// engine can be asked about was actually recorded during ingestion.
    pub ply_depth: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            batch_size: 1000,
            worker_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            progress_interval: 1000,
            ply_depth: 30,
        }
    }
}

/// Settings for one [`crate::query::Query`] lookup.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Maximum ply depth (`K`) a query will walk before stopping.
    pub ply_depth: usize,
    /// Restrict next-move lookups to games played in or after this year.
    pub year_min: Option<i32>,
    /// Restrict next-move lookups to games played in or before this year.
    pub year_max: Option<i32>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            ply_depth: 30,
            year_min: None,
            year_max: None,
        }
    }
}

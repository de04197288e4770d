//! goshelf: a 19x19 Go game-record corpus — ingestion, symmetry-aware
//! position fingerprinting, and next-move lookup.
//!
//! A corpus is built by validating and replaying game records
//! ([`record`], [`rules`]) into a backing [`store`], each position fingerprinted
//! under the board's eight-element symmetry group ([`coord`], [`hasher`]) so
//! that later [`query`] lookups find a recorded continuation regardless of
//! which of the 8 equivalent orientations it was originally played in.
//!
//! ## Modules
//!
//! - [`coord`] - board coordinates and the dihedral symmetry group
//! - [`rules`] - move legality: occupation, suicide, simple ko
//! - [`hasher`] - Zobrist-style position fingerprinting
//! - [`record`] - per-record field extraction and admission rules
//! - [`config`] - ingestion and query tuning knobs
//! - [`store`] - the persistence trait and an in-memory reference implementation
//! - [`ingest`] - the parallel batch ingestion pipeline
//! - [`query`] - symmetry fan-out next-move lookup
//! - [`error`] - the crate-wide error type
//!
//! ## Example
//!
//! ```
//! use goshelf::config::IngestConfig;
//! use goshelf::ingest::{Ingestor, VecRecordSource};
//! use goshelf::query::Query;
//! use goshelf::store::memory::MemoryStore;
//!
//! let store = MemoryStore::new();
//! let ingestor = Ingestor::new(&store, IngestConfig::default());
//! let mut source = VecRecordSource::new(vec![]);
//! ingestor.run(&mut source).unwrap();
//!
//! let query = Query::new(&store);
//! let ranked = query.next_moves(&[]).unwrap();
//! assert!(ranked.is_empty());
//! ```

pub mod config;
pub mod coord;
pub mod error;
pub mod hasher;
pub mod ingest;
pub mod query;
pub mod record;
pub mod rules;
pub mod store;

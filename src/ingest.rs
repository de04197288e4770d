//! Batch corpus ingestion: an embarrassingly-parallel worker pool that
//! validates and replays records, feeding a single-writer main thread that
//! owns player/game ID allocation and the final-position dedup oracle.
//!
//! Grounded in `examples/original_source/src/bgo/dbaccess/_import_tgz.py`'s
//! `build_games` (a `multiprocessing.Pool` over records feeding a single
//! writer), restructured around `crossbeam-channel` the way
//! `examples/Chicoryn-dream-go`'s `dg_mcts` worker pool is built, with
//! `log`/`env_logger`/`indicatif` progress reporting grounded in
//! `examples/kraktus-helpmate-tb`'s batch table-generation CLIs.

use crossbeam_channel::{bounded, Sender};
use indicatif::{ProgressBar, ProgressStyle};

use std::collections::HashMap;

use crate::config::IngestConfig;
use crate::coord::{Alpha, Cart};
use crate::error::{GoshelfError, RecordIssue};
use crate::hasher;
use crate::record::{self, AdmittedRecord, RawRecord};
use crate::rules::Board;
use crate::store::{GameId, NewGame, PositionRow, Store};

/// Pulls raw records one at a time. Real archive formats (tar, zip, a SGF
/// directory tree) implement this; `VecRecordSource` below is the in-memory
/// stand-in used by tests and the demo CLI path.
pub trait RecordSource {
    fn next_record(&mut self) -> Option<RawRecord>;
}

/// A `RecordSource` over records already held in memory.
pub struct VecRecordSource {
    records: std::vec::IntoIter<RawRecord>,
}

impl VecRecordSource {
    pub fn new(records: Vec<RawRecord>) -> VecRecordSource {
        VecRecordSource {
            records: records.into_iter(),
        }
    }
}

impl RecordSource for VecRecordSource {
    fn next_record(&mut self) -> Option<RawRecord> {
        self.records.next()
    }
}

/// Tallies of one ingestion run, reported at the end and via progress logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestTally {
    /// The record parser could not decode the raw record at all.
    pub parse_errors: usize,
    /// The record parsed but failed an admission rule.
    pub rejected: usize,
    /// The record's final position hash was already claimed by an earlier game.
    pub duplicates: usize,
    /// A move in the record's move list was illegal under the rules engine.
    pub invalid_moves: usize,
    /// Admitted and committed cleanly.
    pub added: usize,
    /// Admitted and committed despite an undecodable date (see
    /// [`AdmittedRecord`]'s `exceptional` flag); `game_year` for such games'
    /// position rows is `0`.
    pub exceptional: usize,
}

struct PendingRow {
    ply: usize,
    transform: usize,
    board_hash: i64,
    next_move: Option<Cart>,
}

/// A worker's pure computation over one raw record: admission, legality
/// replay, and fingerprinting, with no access to the store.
enum WorkerOutcome {
    Admitted {
        admitted: AdmittedRecord,
        final_hash: i64,
        rows: Vec<PendingRow>,
    },
    Rejected(RecordIssue),
}

/// Replays `moves` up to `ply_depth` plies, recording the identity-frame
/// fingerprint of every position reached along with the move actually played
/// from it, and returns the identity-frame fingerprint of the final replayed
/// position (the dedup key).
///
/// Only the identity frame (transform 0) is ever written: a query fans its
/// own position out across all 8 transforms and probes this table with each,
/// rather than the table carrying 8 redundant rows per ply (see `query.rs`).
fn compute_rows(moves: &[Alpha], ply_depth: usize) -> Result<(i64, Vec<PendingRow>), String> {
    let mut board = Board::new();
    let mut rows = Vec::new();
    let limit = ply_depth.min(moves.len());

    for (ply, mv) in moves.iter().enumerate().take(limit) {
        let board_hash = hasher::identity_hash(&board);
        let cart = mv.to_cart();
        rows.push(PendingRow {
            ply,
            transform: 0,
            board_hash,
            next_move: Some(cart),
        });
        board
            .play_move(cart)
            .map_err(|e| format!("ply {ply}: {e}"))?;
    }

    Ok((hasher::identity_hash(&board), rows))
}

fn process_record(raw: RawRecord, ply_depth: usize) -> WorkerOutcome {
    let admitted = match record::admit(&raw) {
        Ok(admitted) => admitted,
        Err(issue) => return WorkerOutcome::Rejected(issue),
    };
    match compute_rows(&admitted.moves, ply_depth) {
        Ok((final_hash, rows)) => WorkerOutcome::Admitted {
            admitted,
            final_hash,
            rows,
        },
        Err(reason) => WorkerOutcome::Rejected(RecordIssue::InvalidMove(reason)),
    }
}

/// Drives one ingestion session: a worker pool validates and replays records
/// concurrently; this thread alone allocates player/game IDs, checks and
/// claims final-position hashes, and flushes position rows to the store.
pub struct Ingestor<'a> {
    store: &'a dyn Store,
    config: IngestConfig,
}

impl<'a> Ingestor<'a> {
    pub fn new(store: &'a dyn Store, config: IngestConfig) -> Ingestor<'a> {
        Ingestor { store, config }
    }

    /// Runs one ingest session to completion. Final-position claims are
    /// staged in `staged_final_positions` for the life of this call and
    /// merged into the store in a single atomic swap at the end, so a query
    /// running concurrently with this session only ever sees either none or
    /// all of its newly admitted games.
    pub fn run(&self, source: &mut dyn RecordSource) -> Result<IngestTally, GoshelfError> {
        let mut tally = IngestTally::default();
        let mut staged_final_positions: HashMap<i64, GameId> = HashMap::new();
        let progress = ProgressBar::new_spinner();
        progress.set_style(
            ProgressStyle::with_template("{spinner} {pos} records processed ({msg})").unwrap(),
        );

        let mut batch: Vec<RawRecord> = Vec::with_capacity(self.config.batch_size);
        let mut processed = 0usize;

        loop {
            batch.clear();
            while batch.len() < self.config.batch_size {
                match source.next_record() {
                    Some(record) => batch.push(record),
                    None => break,
                }
            }
            if batch.is_empty() {
                break;
            }

            let outcomes = self.process_batch(std::mem::take(&mut batch));
            let mut pending_rows: Vec<PositionRow> = Vec::new();

            for outcome in outcomes {
                processed += 1;
                match outcome {
                    WorkerOutcome::Rejected(issue) => {
                        match &issue {
                            RecordIssue::Parse(_) => tally.parse_errors += 1,
                            RecordIssue::Rejected(_) => tally.rejected += 1,
                            RecordIssue::InvalidMove(_) => tally.invalid_moves += 1,
                        }
                        log::warn!("record rejected: {issue}");
                    }
                    WorkerOutcome::Admitted {
                        admitted,
                        final_hash,
                        rows,
                    } => {
                        if staged_final_positions.contains_key(&final_hash)
                            || self.store.final_position_owner(final_hash)?.is_some()
                        {
                            tally.duplicates += 1;
                            continue;
                        }
                        let game_id = self.commit_game(&admitted)?;
                        staged_final_positions.insert(final_hash, game_id);
                        let game_year = admitted.game_year.unwrap_or(0);
                        pending_rows.extend(rows.into_iter().map(|r| PositionRow {
                            game_id,
                            ply: r.ply,
                            transform: r.transform,
                            board_hash: r.board_hash,
                            next_move: r.next_move,
                            game_year,
                        }));
                        if admitted.exceptional {
                            tally.exceptional += 1;
                            log::warn!(
                                "game {} admitted with an undecodable date; game_year unknown",
                                game_id.0
                            );
                        } else {
                            tally.added += 1;
                        }
                    }
                }

                if processed % self.config.progress_interval == 0 {
                    log::info!(
                        "progress: {processed} processed, {} added, {} exceptional, {} rejected, {} duplicates",
                        tally.added,
                        tally.exceptional,
                        tally.rejected,
                        tally.duplicates
                    );
                }
                progress.set_position(processed as u64);
            }

            if !pending_rows.is_empty() {
                self.store.append_position_rows(&pending_rows)?;
            }
        }

        let mut final_positions = self.store.final_positions()?;
        final_positions.extend(staged_final_positions);
        self.store.replace_final_positions(final_positions)?;

        progress.finish_with_message(format!(
            "done: {} added, {} exceptional, {} rejected, {} duplicates",
            tally.added, tally.exceptional, tally.rejected, tally.duplicates
        ));
        Ok(tally)
    }

    fn commit_game(&self, admitted: &AdmittedRecord) -> Result<GameId, GoshelfError> {
        let black_id = self.store.get_or_create_player(&admitted.black_name)?;
        let white_id = self.store.get_or_create_player(&admitted.white_name)?;
        let game_id = self.store.create_game(NewGame {
            black_id,
            white_id,
            black_rank: admitted.black_rank,
            white_rank: admitted.white_rank,
            event: admitted.event.clone(),
            round: admitted.round.clone(),
            date: admitted.date.clone(),
            place: admitted.place.clone(),
            komi: admitted.komi.clone(),
            result: admitted.result.clone(),
            winner: admitted.winner,
            move_count: admitted.moves.len(),
        })?;
        Ok(game_id)
    }

    /// Fans `records` out across `config.worker_count` threads, each running
    /// the pure `process_record` computation with no store access, and
    /// returns outcomes in submission order.
    fn process_batch(&self, records: Vec<RawRecord>) -> Vec<WorkerOutcome> {
        let worker_count = self.config.worker_count.max(1).min(records.len().max(1));
        let ply_depth = self.config.ply_depth;

        if worker_count <= 1 {
            return records
                .into_iter()
                .map(|r| process_record(r, ply_depth))
                .collect();
        }

        let (job_tx, job_rx) = bounded::<(usize, RawRecord)>(records.len());
        let (result_tx, result_rx) = bounded::<(usize, WorkerOutcome)>(records.len());
        let total = records.len();

        std::thread::scope(|scope| {
            for _ in 0..worker_count {
                let job_rx = job_rx.clone();
                let result_tx: Sender<(usize, WorkerOutcome)> = result_tx.clone();
                scope.spawn(move || {
                    for (index, raw) in job_rx {
                        let outcome = process_record(raw, ply_depth);
                        if result_tx.send((index, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);

            for (index, raw) in records.into_iter().enumerate() {
                let _ = job_tx.send((index, raw));
            }
            drop(job_tx);

            let mut slots: Vec<Option<WorkerOutcome>> = (0..total).map(|_| None).collect();
            for (index, outcome) in result_rx {
                slots[index] = Some(outcome);
            }
            slots.into_iter().map(|o| o.unwrap()).collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn thirty_moves() -> Vec<String> {
        [
            "pd", "dp", "pp", "dd", "fq", "cn", "qf", "nc", "qn", "jp", "qq", "pq", "qp", "po",
            "oq", "pr", "or", "qr", "rq", "rp", "on", "pn", "om", "nq", "np", "mq", "mp", "lq",
            "lp", "kq",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn base_record(black: &str, white: &str) -> RawRecord {
        RawRecord {
            board_size: Some("19".into()),
            handicap: None,
            black_name: Some(black.into()),
            white_name: Some(white.into()),
            black_rank: Some("5d".into()),
            white_rank: Some("6d".into()),
            event: Some("Test".into()),
            round: Some("1".into()),
            date: Some("2020-01-01".into()),
            place: Some("".into()),
            komi: Some("6.5".into()),
            result: Some("B+R".into()),
            moves: thirty_moves(),
        }
    }

    #[test]
    fn admits_a_single_valid_record() {
        let store = MemoryStore::new();
        let config = IngestConfig {
            batch_size: 10,
            worker_count: 2,
            progress_interval: 1000,
            ply_depth: 30,
        };
        let ingestor = Ingestor::new(&store, config);
        let mut source = VecRecordSource::new(vec![base_record("Alice", "Bob")]);
        let tally = ingestor.run(&mut source).unwrap();
        assert_eq!(
            tally,
            IngestTally {
                parse_errors: 0,
                rejected: 0,
                duplicates: 0,
                invalid_moves: 0,
                added: 1,
                exceptional: 0,
            }
        );
    }

    #[test]
    fn second_identical_game_is_counted_as_duplicate() {
        let store = MemoryStore::new();
        let config = IngestConfig {
            batch_size: 10,
            worker_count: 2,
            progress_interval: 1000,
            ply_depth: 30,
        };
        let ingestor = Ingestor::new(&store, config);
        let mut source =
            VecRecordSource::new(vec![base_record("Alice", "Bob"), base_record("Carl", "Dee")]);
        let tally = ingestor.run(&mut source).unwrap();
        assert_eq!(tally.added, 1);
        assert_eq!(tally.duplicates, 1);
    }

    #[test]
    fn invalid_record_is_rejected_not_fatal() {
        let store = MemoryStore::new();
        let config = IngestConfig {
            batch_size: 10,
            worker_count: 2,
            progress_interval: 1000,
            ply_depth: 30,
        };
        let ingestor = Ingestor::new(&store, config);
        let mut bad = base_record("Alice", "Bob");
        bad.black_name = Some("".into());
        let mut source = VecRecordSource::new(vec![bad, base_record("Carl", "Dee")]);
        let tally = ingestor.run(&mut source).unwrap();
        assert_eq!(tally.added, 1);
        assert_eq!(tally.rejected, 1);
    }

    #[test]
    fn undecodable_date_is_admitted_as_exceptional() {
        let store = MemoryStore::new();
        let config = IngestConfig {
            batch_size: 10,
            worker_count: 1,
            progress_interval: 1000,
            ply_depth: 30,
        };
        let ingestor = Ingestor::new(&store, config);
        let mut undated = base_record("Alice", "Bob");
        undated.date = Some("not a date".into());
        let mut source = VecRecordSource::new(vec![undated]);
        let tally = ingestor.run(&mut source).unwrap();
        assert_eq!(tally.added, 0);
        assert_eq!(tally.exceptional, 1);
        assert_eq!(tally.rejected, 0);
    }
}

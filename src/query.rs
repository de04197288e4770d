//! The query engine: given a position as a move sequence, find every recorded
//! continuation across all 8 symmetry-equivalent framings, folded back to the
//! querying frame and ranked by popularity.
//!
//! Grounded in `examples/original_source/src/bgo/dbaccess/_lookup.py`'s
//! `lookup_next_move` (fan-out across transforms, `from_transform` bookkeeping,
//! sort by count descending) and `_merge_next_move.py`'s
//! `_merge_next_move_data` (the residual-symmetry merge, including the
//! `|S| == 7` tengen special case).

use std::collections::HashMap;

use crate::config::QueryConfig;
use crate::coord::{self, Cart};
use crate::error::GoshelfError;
use crate::hasher;
use crate::rules::Board;
use crate::store::{Game, GameHashRow, GameId, Store};

/// One ranked candidate move returned by [`Query::next_moves`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedMove {
    /// The move, already folded back into the querying frame.
    pub coord: Option<Cart>,
    pub count: i64,
}

/// Looks up recorded continuations and the games that reached a position.
pub struct Query<'a> {
    store: &'a dyn Store,
    config: QueryConfig,
}

impl<'a> Query<'a> {
    pub fn new(store: &'a dyn Store) -> Query<'a> {
        Query::with_config(store, QueryConfig::default())
    }

    pub fn with_config(store: &'a dyn Store, config: QueryConfig) -> Query<'a> {
        Query { store, config }
    }

    /// Finds every recorded next move from the position reached by playing
    /// `moves` from the empty board, ranked by total play count descending.
    ///
    /// Fans out across all 8 symmetry transforms of the position, dedupes by
    /// fingerprint (a transform whose fingerprint repeats one already seen is
    /// skipped, matching the source this was distilled from), folds each
    /// surviving transform's moves back to the identity frame, then merges
    /// moves that remain equivalent under the position's own residual
    /// symmetry.
    pub fn next_moves(&self, moves: &[Cart]) -> Result<Vec<RankedMove>, GoshelfError> {
        let mut board = Board::new();
        for &m in moves {
            board
                .play_move(m)
                .map_err(|e| GoshelfError::Invariant(format!("illegal query position: {e}")))?;
        }

        let fingerprints = hasher::fingerprints(&board);
        let mut seen_hashes: Vec<i64> = Vec::new();
        // Non-identity transform numbers whose fingerprint repeats one
        // already seen: the position's residual symmetry. `len() == 7`
        // means every non-identity transform collapsed (the fully
        // symmetric / tengen case).
        let mut residual_symmetry: Vec<usize> = Vec::new();
        let mut folded: HashMap<Cart, i64> = HashMap::new();
        let mut pass_count: i64 = 0;

        for (n, &hash) in fingerprints.iter().enumerate() {
            if seen_hashes.contains(&hash) {
                if n != 0 {
                    residual_symmetry.push(n);
                }
                continue;
            }
            seen_hashes.push(hash);

            for candidate in self
                .store
                .lookup_positions(hash, self.config.year_min, self.config.year_max)?
            {
                match candidate.next_move {
                    None => pass_count += candidate.count,
                    Some(mv) => {
                        let folded_coord = if n == 0 {
                            mv
                        } else {
                            coord::transform(mv, n, true)
                        };
                        *folded.entry(folded_coord).or_insert(0) += candidate.count;
                    }
                }
            }
        }

        let merged = merge_residual_symmetry(folded, &residual_symmetry)?;

        let mut ranked: Vec<RankedMove> = merged
            .into_iter()
            .map(|(coord, count)| RankedMove {
                coord: Some(coord),
                count,
            })
            .collect();
        if pass_count > 0 {
            ranked.push(RankedMove {
                coord: None,
                count: pass_count,
            });
        }
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(ranked)
    }

    /// Every recorded position row reachable from `moves` under some
    /// symmetry, richly detailed and sorted by game date descending, capped
    /// at `limit` rows.
    pub fn games_reaching(&self, moves: &[Cart], limit: usize) -> Result<Vec<GameHashRow>, GoshelfError> {
        let mut board = Board::new();
        for &m in moves {
            board
                .play_move(m)
                .map_err(|e| GoshelfError::Invariant(format!("illegal query position: {e}")))?;
        }
        let fingerprints = hasher::fingerprints(&board);
        self.store.games_for_hashes(&fingerprints, limit)
    }

    /// Looks up a single game by ID.
    pub fn game(&self, id: GameId) -> Result<Game, GoshelfError> {
        self.store.get_game(id)
    }
}

/// Merges moves that remain equivalent once the querying position's own
/// residual symmetry `s` is accounted for.
///
/// `s` always includes `0` (every position is at least symmetric under the
/// identity). When it also includes every other transform (`|s| == 7`, the
/// fully symmetric / tengen case), every folded move is first collapsed into
/// the upper-right quadrant representative (summing on collision) and then
/// treated as residual symmetry `{7}` for the remaining merge pass, mirroring
/// `_merge_next_move_data`'s special case.
fn merge_residual_symmetry(
    folded: HashMap<Cart, i64>,
    residual_symmetry: &[usize],
) -> Result<HashMap<Cart, i64>, GoshelfError> {
    if residual_symmetry.len() == 7 {
        let mut collapsed: HashMap<Cart, i64> = HashMap::new();
        for (coord, count) in folded {
            let n = coord::which_transform_to_move_to_upper_right(coord);
            let rep = if n == 0 { coord } else { coord::transform(coord, n, false) };
            *collapsed.entry(rep).or_insert(0) += count;
        }
        return merge_pairwise(collapsed, &[7]);
    }
    merge_pairwise(folded, residual_symmetry)
}

/// Pairwise-merges `folded` under each non-identity transform in `residual`,
/// picking the biased representative per [`coord::bias_coord_for_merge`] and
/// summing counts, while never double-counting a pair already merged under an
/// earlier transform in the list.
fn merge_pairwise(
    mut folded: HashMap<Cart, i64>,
    residual: &[usize],
) -> Result<HashMap<Cart, i64>, GoshelfError> {
    for &n in residual {
        if n == 0 {
            continue;
        }
        let mut merged_pairs: Vec<(Cart, Cart)> = Vec::new();
        let coords: Vec<Cart> = folded.keys().copied().collect();
        for &a in &coords {
            let b = coord::transform(a, n, false);
            if a == b {
                continue;
            }
            let already_merged = merged_pairs
                .iter()
                .any(|&(x, y)| (x == a && y == b) || (x == b && y == a));
            if already_merged {
                continue;
            }
            if let (Some(&count_a), Some(&count_b)) = (folded.get(&a), folded.get(&b)) {
                let winner = coord::bias_coord_for_merge(a, b, n)?;
                let loser = if winner == a { b } else { a };
                let total = count_a + count_b;
                folded.remove(&loser);
                folded.insert(winner, total);
                merged_pairs.push((a, b));
            }
        }
    }
    Ok(folded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Alpha;
    use crate::ingest::{Ingestor, VecRecordSource};
    use crate::config::IngestConfig;
    use crate::record::RawRecord;
    use crate::store::memory::MemoryStore;

    fn alpha(s: &str) -> Cart {
        Alpha::parse(s).to_cart()
    }

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

    fn base_record() -> RawRecord {
        base_record_dated("2020-01-01")
    }

    fn base_record_dated(date: &str) -> RawRecord {
        RawRecord {
            board_size: Some("19".into()),
            handicap: None,
            black_name: Some("Alice".into()),
            white_name: Some("Bob".into()),
            black_rank: Some("5d".into()),
            white_rank: Some("6d".into()),
            event: Some("Test".into()),
            round: Some("1".into()),
            date: Some(date.into()),
            place: Some("".into()),
            komi: Some("6.5".into()),
            result: Some("B+R".into()),
            moves: thirty_moves(),
        }
    }

    #[test]
    fn empty_corpus_returns_no_candidates() {
        let store = MemoryStore::new();
        let query = Query::new(&store);
        let ranked = query.next_moves(&[]).unwrap();
        assert!(ranked.is_empty());
    }

    #[test]
    fn single_game_surfaces_its_first_move_via_symmetry() {
        let store = MemoryStore::new();
        let config = IngestConfig {
            batch_size: 10,
            worker_count: 1,
            progress_interval: 1000,
            ply_depth: 30,
        };
        let ingestor = Ingestor::new(&store, config);
        let mut source = VecRecordSource::new(vec![base_record()]);
        ingestor.run(&mut source).unwrap();

        let query = Query::new(&store);
        let ranked = query.next_moves(&[]).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].coord, Some(alpha("pd")));
        assert_eq!(ranked[0].count, 1);
    }

    #[test]
    fn two_games_sharing_an_opening_aggregate_counts() {
        let store = MemoryStore::new();
        let config = IngestConfig {
            batch_size: 10,
            worker_count: 1,
            progress_interval: 1000,
            ply_depth: 30,
        };
        let ingestor = Ingestor::new(&store, config);
        let first = base_record();
        let mut second = base_record();
        second.black_name = Some("Carl".into());
        second.white_name = Some("Dee".into());
        second.moves[29] = "ic".into(); // differs late so the final hash differs too

        let mut source = VecRecordSource::new(vec![first, second]);
        let tally = ingestor.run(&mut source).unwrap();
        assert_eq!(tally.added, 2);

        let query = Query::new(&store);
        let ranked = query.next_moves(&[]).unwrap();
        assert_eq!(ranked[0].coord, Some(alpha("pd")));
        assert_eq!(ranked[0].count, 2);
    }

    #[test]
    fn next_moves_with_equal_year_min_and_max_only_returns_that_year() {
        let store = MemoryStore::new();
        let config = IngestConfig {
            batch_size: 10,
            worker_count: 1,
            progress_interval: 1000,
            ply_depth: 30,
        };
        let ingestor = Ingestor::new(&store, config);

        let mut from_2019 = base_record_dated("2019-03-01");
        from_2019.black_name = Some("Carl".into());
        from_2019.white_name = Some("Dee".into());
        from_2019.moves[29] = "ic".into();

        let mut source = VecRecordSource::new(vec![base_record_dated("2020-01-01"), from_2019]);
        let tally = ingestor.run(&mut source).unwrap();
        assert_eq!(tally.added, 2);

        let query = Query::with_config(
            &store,
            QueryConfig {
                year_min: Some(2020),
                year_max: Some(2020),
                ..QueryConfig::default()
            },
        );
        let ranked = query.next_moves(&[]).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].coord, Some(alpha("pd")));
        assert_eq!(ranked[0].count, 1);
    }
}

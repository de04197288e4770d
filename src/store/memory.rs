//! An in-memory [`Store`], backed by `RwLock`-guarded vectors and hash
//! indexes, with an optional JSON snapshot file for persistence across runs.
//!
//! This is the reference implementation used by tests, the demo CLI path,
//! and anywhere a real database is not wired up; it is not meant to scale
//! past what comfortably fits in memory. Snapshotting is grounded in
//! `examples/kraktus-helpmate-tb`'s use of `serde`/`serde_json` for its own
//! on-disk table format.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::RwLock;

use crate::coord::Cart;
use crate::error::GoshelfError;

use super::{Game, GameHashRow, GameId, NewGame, NextMoveCount, Player, PlayerId, PositionRow, Store};

#[derive(Default, serde::Serialize, serde::Deserialize)]
struct Snapshot {
    players: Vec<Player>,
    games: Vec<Game>,
    final_positions: Vec<(i64, GameId)>,
    position_rows: Vec<PositionRow>,
}

#[derive(Default)]
struct Inner {
    players: Vec<Player>,
    player_by_name: HashMap<String, PlayerId>,
    games: Vec<Game>,
    final_positions: HashMap<i64, GameId>,
    /// Every recorded position row, in append order.
    position_rows: Vec<PositionRow>,
    /// Indices into `position_rows`, grouped by `board_hash`.
    rows_by_hash: HashMap<i64, Vec<usize>>,
}

impl Inner {
    fn index_row(&mut self, row: PositionRow) {
        let index = self.position_rows.len();
        self.rows_by_hash.entry(row.board_hash).or_default().push(index);
        self.position_rows.push(row);
    }
}

/// In-memory `Store` implementation. Cheap to construct; clone the `Arc`
/// around it rather than the store itself if it needs to be shared.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Loads a store from a JSON snapshot previously written by [`Self::save_to_file`].
    pub fn load_from_file(path: &Path) -> Result<MemoryStore, GoshelfError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| GoshelfError::StoreFailure(format!("reading snapshot: {e}")))?;
        let snapshot: Snapshot = serde_json::from_str(&data)
            .map_err(|e| GoshelfError::StoreFailure(format!("parsing snapshot: {e}")))?;

        let mut inner = Inner::default();
        for player in snapshot.players {
            inner.player_by_name.insert(player.name.clone(), player.id);
            inner.players.push(player);
        }
        inner.games = snapshot.games;
        for (hash, game_id) in snapshot.final_positions {
            inner.final_positions.insert(hash, game_id);
        }
        for row in snapshot.position_rows {
            inner.index_row(row);
        }
        Ok(MemoryStore {
            inner: RwLock::new(inner),
        })
    }

    /// Writes a full JSON snapshot of this store's contents.
    pub fn save_to_file(&self, path: &Path) -> Result<(), GoshelfError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| GoshelfError::StoreFailure("lock poisoned".into()))?;

        let snapshot = Snapshot {
            players: inner.players.clone(),
            games: inner.games.clone(),
            final_positions: inner.final_positions.iter().map(|(&h, &g)| (h, g)).collect(),
            position_rows: inner.position_rows.clone(),
        };
        let data = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| GoshelfError::StoreFailure(format!("encoding snapshot: {e}")))?;
        std::fs::write(path, data)
            .map_err(|e| GoshelfError::StoreFailure(format!("writing snapshot: {e}")))
    }
}

impl Store for MemoryStore {
    fn get_or_create_player(&self, name: &str) -> Result<PlayerId, GoshelfError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| GoshelfError::StoreFailure("lock poisoned".into()))?;
        if let Some(&id) = inner.player_by_name.get(name) {
            return Ok(id);
        }
        let id = PlayerId(inner.players.len() as i64 + 1);
        inner.players.push(Player {
            id,
            name: name.to_string(),
        });
        inner.player_by_name.insert(name.to_string(), id);
        Ok(id)
    }

    fn get_player(&self, id: PlayerId) -> Result<Player, GoshelfError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| GoshelfError::StoreFailure("lock poisoned".into()))?;
        inner
            .players
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(GoshelfError::NotFound)
    }

    fn create_game(&self, new_game: NewGame) -> Result<GameId, GoshelfError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| GoshelfError::StoreFailure("lock poisoned".into()))?;
        let id = GameId(inner.games.len() as i64 + 1);
        inner.games.push(Game {
            id,
            black_id: new_game.black_id,
            white_id: new_game.white_id,
            black_rank: new_game.black_rank,
            white_rank: new_game.white_rank,
            event: new_game.event,
            round: new_game.round,
            date: new_game.date,
            place: new_game.place,
            komi: new_game.komi,
            result: new_game.result,
            winner: new_game.winner,
            move_count: new_game.move_count,
        });
        Ok(id)
    }

    fn get_game(&self, id: GameId) -> Result<Game, GoshelfError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| GoshelfError::StoreFailure("lock poisoned".into()))?;
        inner
            .games
            .iter()
            .find(|g| g.id == id)
            .cloned()
            .ok_or(GoshelfError::NotFound)
    }

    fn final_position_owner(&self, hash: i64) -> Result<Option<GameId>, GoshelfError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| GoshelfError::StoreFailure("lock poisoned".into()))?;
        Ok(inner.final_positions.get(&hash).copied())
    }

    fn insert_final_position(&self, hash: i64, game_id: GameId) -> Result<(), GoshelfError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| GoshelfError::StoreFailure("lock poisoned".into()))?;
        if inner.final_positions.contains_key(&hash) {
            return Err(GoshelfError::Duplicate("final position hash".into()));
        }
        inner.final_positions.insert(hash, game_id);
        Ok(())
    }

    fn final_positions(&self) -> Result<HashMap<i64, GameId>, GoshelfError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| GoshelfError::StoreFailure("lock poisoned".into()))?;
        Ok(inner.final_positions.clone())
    }

    fn replace_final_positions(&self, mapping: HashMap<i64, GameId>) -> Result<(), GoshelfError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| GoshelfError::StoreFailure("lock poisoned".into()))?;
        inner.final_positions = mapping;
        Ok(())
    }

    fn append_position_rows(&self, rows: &[PositionRow]) -> Result<(), GoshelfError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| GoshelfError::StoreFailure("lock poisoned".into()))?;
        for row in rows {
            inner.index_row(row.clone());
        }
        Ok(())
    }

    fn lookup_positions(
        &self,
        hash: i64,
        year_min: Option<i32>,
        year_max: Option<i32>,
    ) -> Result<Vec<NextMoveCount>, GoshelfError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| GoshelfError::StoreFailure("lock poisoned".into()))?;
        let mut games_by_move: HashMap<Option<Cart>, HashSet<GameId>> = HashMap::new();
        if let Some(indices) = inner.rows_by_hash.get(&hash) {
            for &index in indices {
                let row = &inner.position_rows[index];
                if year_min.is_some_and(|y| row.game_year < y) {
                    continue;
                }
                if year_max.is_some_and(|y| row.game_year > y) {
                    continue;
                }
                games_by_move.entry(row.next_move).or_default().insert(row.game_id);
            }
        }
        Ok(games_by_move
            .into_iter()
            .map(|(next_move, games)| NextMoveCount {
                next_move,
                count: games.len() as i64,
            })
            .collect())
    }

    fn games_for_hashes(&self, hashes: &[i64], limit: usize) -> Result<Vec<GameHashRow>, GoshelfError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| GoshelfError::StoreFailure("lock poisoned".into()))?;
        let mut rows = Vec::new();
        for (rotation, &hash) in hashes.iter().enumerate() {
            let Some(indices) = inner.rows_by_hash.get(&hash) else {
                continue;
            };
            for &index in indices {
                let row = &inner.position_rows[index];
                let Some(game) = inner.games.iter().find(|g| g.id == row.game_id) else {
                    continue;
                };
                let Some(white) = inner.players.iter().find(|p| p.id == game.white_id) else {
                    continue;
                };
                let Some(black) = inner.players.iter().find(|p| p.id == game.black_id) else {
                    continue;
                };
                rows.push(GameHashRow {
                    board_hash: hash,
                    game_id: row.game_id,
                    rotation,
                    move_number: row.ply,
                    next_move: row.next_move,
                    white_id: game.white_id,
                    white_rank: game.white_rank,
                    black_id: game.black_id,
                    black_rank: game.black_rank,
                    white_name: white.name.clone(),
                    black_name: black.name.clone(),
                    game_date: game.date.clone(),
                });
            }
        }
        rows.sort_by(|a, b| b.game_date.cmp(&a.game_date));
        rows.truncate(limit);
        Ok(rows)
    }
}

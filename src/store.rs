//! The persistence boundary: domain rows plus the `Store` trait every backend
//! must implement. Persistence technology is explicitly out of scope for this
//! crate; [`memory::MemoryStore`] is the reference implementation used by
//! tests and the demo CLI path.
//!
//! Grounded in `examples/original_source/src/bgo/dbaccess/_lookup.py` (the
//! shape of `lookup_next_move_from_moves` and `get_games_for_hashes`) and
//! `_import_tgz.py` (player/game creation during ingestion).

pub mod memory;

use std::collections::HashMap;

use crate::coord::Cart;
use crate::error::GoshelfError;
use crate::record::Winner;

/// Opaque player identifier, assigned by the store on first insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PlayerId(pub i64);

/// Opaque game identifier, assigned by the store on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct GameId(pub i64);

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

/// A fully-admitted game, ready to be committed to the store.
#[derive(Debug, Clone)]
pub struct NewGame {
    pub black_id: PlayerId,
    pub white_id: PlayerId,
    pub black_rank: i32,
    pub white_rank: i32,
    pub event: String,
    pub round: String,
    pub date: String,
    pub place: String,
    pub komi: String,
    pub result: String,
    pub winner: Winner,
    pub move_count: usize,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Game {
    pub id: GameId,
    pub black_id: PlayerId,
    pub white_id: PlayerId,
    pub black_rank: i32,
    pub white_rank: i32,
    pub event: String,
    pub round: String,
    pub date: String,
    pub place: String,
    pub komi: String,
    pub result: String,
    pub winner: Winner,
    pub move_count: usize,
}

/// One row of the position table: at ply `ply` of `game_id`, under identity
/// transform `n`'s frame, the board fingerprint was `board_hash` and the move
/// actually played next was `next_move` (`None` for a final position with no
/// next move, e.g. the game's last ply). `game_year` is the game's year as
/// decoded from its date tag, or `0` if the date could not be decoded (an
/// "exceptional" admission; see `ingest::IngestTally`).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PositionRow {
    pub game_id: GameId,
    pub ply: usize,
    pub transform: usize,
    pub board_hash: i64,
    pub next_move: Option<Cart>,
    pub game_year: i32,
}

/// One candidate next move and how many recorded games play it from a given
/// position, aggregated across every game/transform pair that hashed there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextMoveCount {
    pub next_move: Option<Cart>,
    pub count: i64,
}

/// One game whose recorded move sequence passed through a queried position,
/// with enough detail to display it directly: which move it played next from
/// there, both players, and the game's date. `rotation` is the transform
/// index under which it matched (the transform needed to view `next_move` in
/// the querying frame).
#[derive(Debug, Clone)]
pub struct GameHashRow {
    pub board_hash: i64,
    pub game_id: GameId,
    pub rotation: usize,
    pub move_number: usize,
    pub next_move: Option<Cart>,
    pub white_id: PlayerId,
    pub white_rank: i32,
    pub black_id: PlayerId,
    pub black_rank: i32,
    pub white_name: String,
    pub black_name: String,
    pub game_date: String,
}

/// The persistence operations the ingestion and query engines need.
///
/// Implementations must make `final_position` lookups and inserts behave as
/// a single dedup oracle: `insert_final_position` must fail with
/// [`GoshelfError::Duplicate`] if the hash is already present, and readers
/// must never observe a hash as present before its owning game is visible
/// via `get_game`. `final_positions`/`replace_final_positions` give an
/// ingest session a way to stage claims in memory and commit them to the
/// store in one atomic swap at session end, so a concurrent query never sees
/// a session's games only partially registered.
pub trait Store: Send + Sync {
    /// Looks up a player by exact name, or creates one if absent. Player
    /// names are the store's only player-identifying key.
    fn get_or_create_player(&self, name: &str) -> Result<PlayerId, GoshelfError>;

    fn get_player(&self, id: PlayerId) -> Result<Player, GoshelfError>;

    /// Inserts a new game row. Does not touch position rows or the
    /// final-position table; callers sequence those separately.
    fn create_game(&self, new_game: NewGame) -> Result<GameId, GoshelfError>;

    fn get_game(&self, id: GameId) -> Result<Game, GoshelfError>;

    /// Returns the game that already owns `hash`, if any, without inserting.
    fn final_position_owner(&self, hash: i64) -> Result<Option<GameId>, GoshelfError>;

    /// Claims `hash` for `game_id`. Returns [`GoshelfError::Duplicate`] if
    /// another game already owns it.
    fn insert_final_position(&self, hash: i64, game_id: GameId) -> Result<(), GoshelfError>;

    /// A full copy of the final-position dedup table.
    fn final_positions(&self) -> Result<HashMap<i64, GameId>, GoshelfError>;

    /// Atomically truncates and reloads the final-position dedup table from
    /// `mapping`. Used once at the end of an ingest session.
    fn replace_final_positions(&self, mapping: HashMap<i64, GameId>) -> Result<(), GoshelfError>;

    /// Appends a batch of position rows. Not deduplicated; callers only ever
    /// append rows for games that passed the final-position dedup check.
    fn append_position_rows(&self, rows: &[PositionRow]) -> Result<(), GoshelfError>;

    /// Every next move recorded from exactly the position fingerprinted as
    /// `hash`, aggregated by move with the number of distinct games that
    /// played it, restricted to games whose `game_year` falls within
    /// `[year_min, year_max]` inclusive when given.
    fn lookup_positions(
        &self,
        hash: i64,
        year_min: Option<i32>,
        year_max: Option<i32>,
    ) -> Result<Vec<NextMoveCount>, GoshelfError>;

    /// For each of `hashes` (indexed 0..8 by transform number, as produced by
    /// [`crate::hasher::fingerprints`]), every recorded position row whose
    /// board hash matches, tagged with which transform index matched,
    /// sorted by game date descending and capped at `limit` rows.
    fn games_for_hashes(&self, hashes: &[i64], limit: usize) -> Result<Vec<GameHashRow>, GoshelfError>;
}

//! Zobrist-style per-ply position fingerprint.
//!
//! `Z[0..360]` is a build-time constant table of 64-bit integers, one per board
//! cell. It is generated once, deterministically, by a small splitmix64-style
//! mixer seeded from the cell index (not loaded from an external file, the way
//! `patterns.rs`'s 3x3 pattern table in this crate's ancestor is also a Rust
//! constant rather than external data) so it is reproducible and auditable.
//! Swapping the generator invalidates every stored fingerprint, exactly like
//! swapping a checked-in table would.

use std::sync::OnceLock;

use crate::coord::{self, Cart, SIZE};
use crate::rules::{Board, Color};

const CELLS: usize = (SIZE * SIZE) as usize;

fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9E3779B97F4A7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

fn zobrist_table() -> &'static [i64; CELLS] {
    static TABLE: OnceLock<[i64; CELLS]> = OnceLock::new();
    TABLE.get_or_init(|| std::array::from_fn(|i| splitmix64(i as u64 + 1) as i64))
}

/// Computes the identity-frame (`n = 0`) fingerprint of `board`.
pub fn identity_hash(board: &Board) -> i64 {
    hash(board, 0)
}

/// Computes the fingerprint of `board` as seen under dihedral transform `n`.
///
/// All arithmetic wraps on 64-bit two's-complement overflow, matching the
/// original fixed-width accumulation so every implementation of this system
/// computes bit-identical values.
pub fn hash(board: &Board, n: usize) -> i64 {
    let z = zobrist_table();
    let mut total: i64 = 0;
    for (c, color) in board.stones() {
        let hc = if n == 0 { c } else { coord::transform(c, n, false) };
        let value = z[hc.index()];
        total = match color {
            Color::Black => total.wrapping_add(value),
            Color::White => total.wrapping_sub(value),
        };
    }
    total
}

/// Computes `[hash(board, 0), ..., hash(board, 7)]` in one pass over the
/// board's stones.
pub fn fingerprints(board: &Board) -> [i64; 8] {
    let z = zobrist_table();
    let mut totals = [0i64; 8];
    for (c, color) in board.stones() {
        for (n, total) in totals.iter_mut().enumerate() {
            let hc = if n == 0 { c } else { coord::transform(c, n, false) };
            let value = z[hc.index()];
            *total = match color {
                Color::Black => total.wrapping_add(value),
                Color::White => total.wrapping_sub(value),
            };
        }
    }
    totals
}

/// The table value for a single cell, exposed for tests and invariant checks.
pub fn cell_value(c: Cart) -> i64 {
    zobrist_table()[c.index()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Alpha;

    #[test]
    fn empty_board_hashes_to_zero() {
        let b = Board::new();
        assert_eq!(identity_hash(&b), 0);
        assert_eq!(fingerprints(&b), [0; 8]);
    }

    #[test]
    fn single_black_stone_at_tengen_is_a_fixed_point() {
        let mut b = Board::new();
        b.play_move(Alpha::parse("jj").to_cart()).unwrap(); // (9,9), tengen
        let expected = cell_value(Cart::new(9, 9));
        assert_eq!(identity_hash(&b), expected);
        for n in 0..8 {
            assert_eq!(hash(&b, n), expected);
        }
    }

    #[test]
    fn transformed_hash_equals_identity_hash_of_transformed_board() {
        let mut b = Board::new();
        for mv in ["pd", "dp", "pp"] {
            b.play_move(Alpha::parse(mv).to_cart()).unwrap();
        }
        for n in 0..8 {
            let mut transformed = Board::new();
            let moves: Vec<Cart> = b
                .move_list()
                .iter()
                .map(|&c| coord::transform(c, n, false))
                .collect();
            transformed.load_moves(&moves).unwrap();
            assert_eq!(hash(&b, n), identity_hash(&transformed));
        }
    }
}

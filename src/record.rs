//! Per-record validation: extracts a closed set of fields and a move sequence
//! from one raw game record and decides whether it may be imported.
//!
//! Field extraction and move-token decoding are this module's job; whether the
//! move sequence is a *legal* game is [`crate::rules::Board`]'s job. Admission
//! rules and rank/date/winner decoding are grounded directly in
//! `examples/original_source/src/bgo/dbaccess/sgf_wrapper.py`'s
//! `is_valid_for_database_import`, `get_date`, `_convert_rank_string_to_integer`,
//! and `get_who_won`.

use regex::Regex;
use std::sync::OnceLock;

use crate::coord::Alpha;
use crate::error::RecordIssue;

/// Which color won, decoded from the `RE` (result) tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Winner {
    Black,
    White,
    None,
}

/// The closed field set a raw game record may carry, named after the game
/// record tags in spec.md §6 (`SZ, HA, PB, PW, BR, WR, EV, RO, DT, PC, KM, RE`).
///
/// This is a fixed struct, not an open field map: the record parser that
/// produces it is an external collaborator, but the schema it fills in is
/// closed and known here.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    pub board_size: Option<String>,
    pub handicap: Option<String>,
    pub black_name: Option<String>,
    pub white_name: Option<String>,
    pub black_rank: Option<String>,
    pub white_rank: Option<String>,
    pub event: Option<String>,
    pub round: Option<String>,
    pub date: Option<String>,
    pub place: Option<String>,
    pub komi: Option<String>,
    pub result: Option<String>,
    /// Move tokens in playing order, lowercase, as handed over by the record
    /// parser (spec.md §6).
    pub moves: Vec<String>,
}

/// A record that has passed every admission rule and is ready for replay.
#[derive(Debug, Clone)]
pub struct AdmittedRecord {
    pub black_name: String,
    pub white_name: String,
    pub black_rank: i32,
    pub white_rank: i32,
    pub event: String,
    pub round: String,
    /// Always `YYYY-MM-DD`; missing month/day default to `01`. Empty if the
    /// date tag could not be decoded at all (`exceptional` is `true` then).
    pub date: String,
    /// The year extracted from `date`, or `None` if `exceptional`.
    pub game_year: Option<i32>,
    /// `true` if this record's date could not be decoded. It is still
    /// admitted (accepted drift per the admission rules) rather than
    /// rejected, but its position rows carry `game_year: 0` and it is
    /// tallied separately from cleanly admitted records.
    pub exceptional: bool,
    pub place: String,
    pub komi: String,
    pub result: String,
    pub winner: Winner,
    pub moves: Vec<Alpha>,
}

fn non_empty(s: &Option<String>) -> &str {
    s.as_deref().unwrap_or("")
}

/// Decodes a rank string such as `"9d"` or `"4k"` to an integer in
/// `-30..=10`, where positive is dan/pro rank and negative is kyu rank.
/// Unranked or undecodable strings (including honorary titles) decode to `0`.
fn decode_rank(rank: &str) -> i32 {
    let lower = rank.to_ascii_lowercase();
    let Some(split_at) = lower.find(|c: char| c.is_ascii_alphabetic()) else {
        return 0;
    };
    let (numeric_part, rest) = lower.split_at(split_at);
    let Some(letter) = rest.chars().next() else {
        return 0;
    };
    let Ok(n) = numeric_part.trim().parse::<i32>() else {
        return 0;
    };
    match letter {
        'd' | 'p' if (1..=10).contains(&n) => n,
        'k' if (1..=30).contains(&n) => -n,
        _ => 0,
    }
}

fn date_regexes() -> &'static (Regex, Regex, Regex) {
    static RE: OnceLock<(Regex, Regex, Regex)> = OnceLock::new();
    RE.get_or_init(|| {
        (
            Regex::new(r"(\d{4})-(\d{1,2})-(\d{1,2})").unwrap(),
            Regex::new(r"(\d{4})-(\d{1,2})").unwrap(),
            Regex::new(r"(\d{4})").unwrap(),
        )
    })
}

/// Decodes a date tag to `YYYY-MM-DD`, filling a missing month or day with
/// `01`. Returns `None` if no year can be found.
fn decode_date(raw: &str) -> Option<String> {
    let (full, ym, y) = date_regexes();
    if let Some(caps) = full.captures(raw) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        return Some(format!("{year:04}-{month:02}-{day:02}"));
    }
    if let Some(caps) = ym.captures(raw) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        return Some(format!("{year:04}-{month:02}-01"));
    }
    if let Some(caps) = y.captures(raw) {
        let year: i32 = caps[1].parse().ok()?;
        return Some(format!("{year:04}-01-01"));
    }
    None
}

/// Decodes the `RE` (result) tag: case-insensitive `'b'` for Black, else
/// `'w'` for White, else no determinable winner.
fn decode_winner(result: &str) -> Winner {
    let lower = result.to_ascii_lowercase();
    if lower.contains('b') {
        Winner::Black
    } else if lower.contains('w') {
        Winner::White
    } else {
        Winner::None
    }
}

/// Validates and normalizes one raw record, per spec.md §4.4's admission
/// rules. The first failing rule wins; its reason is carried in the returned
/// [`RecordIssue::Rejected`]. An undecodable date is the one exception: it
/// does not fail admission, it only marks the result `exceptional`.
pub fn admit(raw: &RawRecord) -> Result<AdmittedRecord, RecordIssue> {
    let black_name = non_empty(&raw.black_name);
    let white_name = non_empty(&raw.white_name);
    if black_name.is_empty() || white_name.is_empty() {
        return Err(RecordIssue::Rejected(
            "one or both players has a blank name".into(),
        ));
    }

    // An undecodable date is accepted drift, not grounds for rejection
    // (§9): the game is still admitted, with its year left unknown.
    let (date, game_year, exceptional) = match decode_date(non_empty(&raw.date)) {
        Some(decoded) => {
            let year = decoded[..4].parse::<i32>().ok();
            (decoded, year, false)
        }
        None => (String::new(), None, true),
    };

    if let Some(ha) = &raw.handicap {
        if !ha.is_empty() {
            let parsed: i32 = ha
                .parse()
                .map_err(|_| RecordIssue::Rejected("invalid handicap".into()))?;
            if parsed != 0 {
                return Err(RecordIssue::Rejected("handicap game".into()));
            }
        }
    }

    if raw.moves.len() < 30 {
        return Err(RecordIssue::Rejected("less than 30 moves".into()));
    }

    let board_size_ok = match raw.board_size.as_deref().map(str::parse::<i32>) {
        Some(Ok(19)) => true,
        Some(Ok(_)) => false,
        _ => raw.moves.iter().any(|mv| {
            let mut chars = mv.chars();
            let (Some(x), Some(y)) = (chars.next(), chars.next()) else {
                return false;
            };
            (x != 't' && x > 'm') || (y != 't' && y > 'm')
        }),
    };
    if !board_size_ok {
        return Err(RecordIssue::Rejected("not 19x19".into()));
    }

    let black_rank = decode_rank(non_empty(&raw.black_rank));
    let white_rank = decode_rank(non_empty(&raw.white_rank));
    if black_rank < 0 || white_rank < 0 {
        return Err(RecordIssue::Rejected("kyu rank".into()));
    }

    let mut moves = Vec::with_capacity(raw.moves.len());
    for (index, token) in raw.moves.iter().enumerate() {
        let mut chars = token.chars();
        let (Some(x), Some(y), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(RecordIssue::Rejected(format!(
                "invalid coordinate in move #{index}"
            )));
        };
        if !('a'..='t').contains(&x) || !('a'..='t').contains(&y) {
            return Err(RecordIssue::Rejected(format!(
                "invalid coordinate in move #{index}"
            )));
        }
        if index < 30 && (x == 't' || y == 't') {
            return Err(RecordIssue::Rejected("pass within first 30 moves".into()));
        }
        moves.push(Alpha::parse(token));
    }

    let result = non_empty(&raw.result).to_string();
    Ok(AdmittedRecord {
        black_name: black_name.to_string(),
        white_name: white_name.to_string(),
        black_rank,
        white_rank,
        event: non_empty(&raw.event).to_string(),
        round: non_empty(&raw.round).to_string(),
        date,
        game_year,
        exceptional,
        place: non_empty(&raw.place).to_string(),
        komi: non_empty(&raw.komi).to_string(),
        winner: decode_winner(&result),
        result,
        moves,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_record(moves: Vec<&str>) -> RawRecord {
        RawRecord {
            board_size: Some("19".into()),
            handicap: None,
            black_name: Some("Black Player".into()),
            white_name: Some("White Player".into()),
            black_rank: Some("5d".into()),
            white_rank: Some("6d".into()),
            event: Some("Test Event".into()),
            round: Some("1".into()),
            date: Some("2020-01-01".into()),
            place: Some("Nowhere".into()),
            komi: Some("6.5".into()),
            result: Some("B+R".into()),
            moves: moves.into_iter().map(String::from).collect(),
        }
    }

    fn thirty_moves() -> Vec<&'static str> {
        vec![
            "pd", "dp", "pp", "dd", "fq", "cn", "qf", "nc", "qn", "jp", "qq", "pq", "qp", "po",
            "oq", "pr", "or", "qr", "rq", "rp", "on", "pn", "om", "nq", "np", "mq", "mp", "lq",
            "lp", "kq",
        ]
    }

    #[test]
    fn admits_a_well_formed_record() {
        let rec = base_record(thirty_moves());
        let admitted = admit(&rec).unwrap();
        assert_eq!(admitted.date, "2020-01-01");
        assert_eq!(admitted.game_year, Some(2020));
        assert!(!admitted.exceptional);
        assert_eq!(admitted.winner, Winner::Black);
        assert_eq!(admitted.moves.len(), 30);
    }

    #[test]
    fn admits_an_undecodable_date_as_exceptional() {
        let mut rec = base_record(thirty_moves());
        rec.date = Some("not a date".into());
        let admitted = admit(&rec).unwrap();
        assert!(admitted.exceptional);
        assert_eq!(admitted.game_year, None);
    }

    #[test]
    fn rejects_handicap_games() {
        let mut rec = base_record(thirty_moves());
        rec.handicap = Some("2".into());
        assert!(matches!(admit(&rec), Err(RecordIssue::Rejected(_))));
    }

    #[test]
    fn rejects_fewer_than_thirty_moves() {
        let mut rec = base_record(thirty_moves());
        rec.moves.truncate(29);
        assert!(matches!(admit(&rec), Err(RecordIssue::Rejected(_))));
    }

    #[test]
    fn rejects_kyu_rank() {
        let mut rec = base_record(thirty_moves());
        rec.black_rank = Some("4k".into());
        assert!(matches!(admit(&rec), Err(RecordIssue::Rejected(_))));
    }

    #[test]
    fn rejects_early_pass() {
        let mut moves = thirty_moves();
        moves[5] = "tt";
        let rec = base_record(moves);
        assert!(matches!(admit(&rec), Err(RecordIssue::Rejected(_))));
    }

    #[test]
    fn decodes_partial_dates() {
        assert_eq!(decode_date("2005").unwrap(), "2005-01-01");
        assert_eq!(decode_date("2005-07").unwrap(), "2005-07-01");
        assert_eq!(decode_date("2005-07-19").unwrap(), "2005-07-19");
        assert!(decode_date("not a date").is_none());
    }

    #[test]
    fn decodes_ranks() {
        assert_eq!(decode_rank("9d"), 9);
        assert_eq!(decode_rank("1k"), -1);
        assert_eq!(decode_rank("30k"), -30);
        assert_eq!(decode_rank("Kisung"), 0);
        assert_eq!(decode_rank(""), 0);
    }
}

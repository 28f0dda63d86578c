//! Coordinate-move text ("e2e4", "e7e8q") to `ChessMove` translation, plus
//! algebraic notation for the move list, derived by replaying the full
//! coordinate history from the starting position on a scratch board.

use std::str::FromStr;

use chess::{Board, BoardStatus, ChessMove, Color, MoveGen, Piece, Square};
use thiserror::Error;

use crate::game::utils::piece_letter;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("coordinate move must be 4 or 5 characters: {0:?}")]
    BadLength(String),
    #[error("bad square in coordinate move {0:?}")]
    BadSquare(String),
    #[error("bad promotion letter in coordinate move {0:?}")]
    BadPromotion(String),
}

/// A move reconstructed from the coordinate history.
pub struct ReplayedMove {
    pub san: String,
    pub mover: Color,
    pub captured: Option<Piece>,
}

/// Parse a coordinate move: origin square, destination square, optional
/// promotion letter.
pub fn decode(text: &str) -> Result<(Square, Square, Option<Piece>), DecodeError> {
    if !text.is_ascii() || !(4..=5).contains(&text.len()) {
        return Err(DecodeError::BadLength(text.to_string()));
    }
    let text = text.to_ascii_lowercase();
    let from = Square::from_str(&text[0..2]).map_err(|_| DecodeError::BadSquare(text.clone()))?;
    let to = Square::from_str(&text[2..4]).map_err(|_| DecodeError::BadSquare(text.clone()))?;
    let promotion = match text.as_bytes().get(4) {
        None => None,
        Some(&letter) => Some(
            promotion_piece(letter as char).ok_or(DecodeError::BadPromotion(text.clone()))?,
        ),
    };
    Ok((from, to, promotion))
}

/// Render a move back into coordinate form, promotion letter included.
pub fn encode(mv: ChessMove) -> String {
    let mut text = format!("{}{}", mv.get_source(), mv.get_dest());
    if let Some(promotion) = mv.get_promotion() {
        text.push(piece_letter(promotion));
    }
    text
}

pub fn promotion_piece(letter: char) -> Option<Piece> {
    match letter.to_ascii_lowercase() {
        'q' => Some(Piece::Queen),
        'r' => Some(Piece::Rook),
        'b' => Some(Piece::Bishop),
        'n' => Some(Piece::Knight),
        _ => None,
    }
}

/// The piece a move would capture, counting en passant (a pawn changing
/// file onto an empty square).
pub fn captured_piece(board: &Board, mv: ChessMove) -> Option<Piece> {
    if let Some(piece) = board.piece_on(mv.get_dest()) {
        return Some(piece);
    }
    if board.piece_on(mv.get_source()) == Some(Piece::Pawn)
        && mv.get_source().get_file() != mv.get_dest().get_file()
    {
        return Some(Piece::Pawn);
    }
    None
}

/// Replay a coordinate history from the starting position. Stops at the
/// first entry that fails to decode or apply and returns the valid prefix;
/// a malformed history must never bring the move list down with it.
pub fn replay(coords: &[String]) -> Vec<ReplayedMove> {
    let mut board = Board::default();
    let mut out = Vec::with_capacity(coords.len());
    for text in coords {
        let Ok((from, to, promotion)) = decode(text) else {
            break;
        };
        let mv = ChessMove::new(from, to, promotion);
        if !MoveGen::new_legal(&board).any(|m| m == mv) {
            break;
        }
        out.push(ReplayedMove {
            san: san(&board, mv),
            mover: board.side_to_move(),
            captured: captured_piece(&board, mv),
        });
        board = board.make_move_new(mv);
    }
    out
}

/// Standard algebraic notation for a legal move in `board`.
pub fn san(board: &Board, mv: ChessMove) -> String {
    let Some(piece) = board.piece_on(mv.get_source()) else {
        // Not reachable through replay(), which validates legality first.
        return encode(mv);
    };
    let source = mv.get_source();
    let dest = mv.get_dest();

    let file_delta =
        source.get_file().to_index() as i32 - dest.get_file().to_index() as i32;
    let mut san = if piece == Piece::King && file_delta.abs() == 2 {
        if file_delta < 0 {
            "O-O".to_string()
        } else {
            "O-O-O".to_string()
        }
    } else if piece == Piece::Pawn {
        let mut text = String::new();
        if captured_piece(board, mv).is_some() {
            text.push(file_char(source));
            text.push('x');
        }
        text.push_str(&dest.to_string());
        if let Some(promotion) = mv.get_promotion() {
            text.push('=');
            text.push(piece_letter(promotion).to_ascii_uppercase());
        }
        text
    } else {
        let mut text = String::new();
        text.push(piece_letter(piece).to_ascii_uppercase());
        text.push_str(&disambiguation(board, mv, piece));
        if captured_piece(board, mv).is_some() {
            text.push('x');
        }
        text.push_str(&dest.to_string());
        text
    };

    let after = board.make_move_new(mv);
    if after.status() == BoardStatus::Checkmate {
        san.push('#');
    } else if after.checkers().popcnt() > 0 {
        san.push('+');
    }
    san
}

/// Origin qualifier when another piece of the same kind can reach the same
/// destination: file if it settles the ambiguity, else rank, else the full
/// square.
fn disambiguation(board: &Board, mv: ChessMove, piece: Piece) -> String {
    let source = mv.get_source();
    let rivals: Vec<Square> = MoveGen::new_legal(board)
        .filter(|m| {
            m.get_dest() == mv.get_dest()
                && m.get_source() != source
                && board.piece_on(m.get_source()) == Some(piece)
        })
        .map(|m| m.get_source())
        .collect();
    if rivals.is_empty() {
        String::new()
    } else if rivals.iter().all(|s| s.get_file() != source.get_file()) {
        file_char(source).to_string()
    } else if rivals.iter().all(|s| s.get_rank() != source.get_rank()) {
        rank_char(source).to_string()
    } else {
        source.to_string()
    }
}

fn file_char(square: Square) -> char {
    (b'a' + square.get_file().to_index() as u8) as char
}

fn rank_char(square: Square) -> char {
    (b'1' + square.get_rank().to_index() as u8) as char
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(moves: &[&str]) -> Vec<String> {
        moves.iter().map(|m| m.to_string()).collect()
    }

    fn sans(moves: &[&str]) -> Vec<String> {
        replay(&coords(moves)).into_iter().map(|m| m.san).collect()
    }

    #[test]
    fn decode_plain_and_promotion_moves() {
        assert_eq!(
            decode("e2e4").unwrap(),
            (Square::E2, Square::E4, None)
        );
        assert_eq!(
            decode("e7e8q").unwrap(),
            (Square::E7, Square::E8, Some(Piece::Queen))
        );
        // The wire format is lowercase, but uppercase input is tolerated.
        assert_eq!(
            decode("E2E4").unwrap(),
            (Square::E2, Square::E4, None)
        );
    }

    #[test]
    fn decode_rejects_malformed_text() {
        assert_eq!(decode("e2"), Err(DecodeError::BadLength("e2".to_string())));
        assert_eq!(decode("e2e4e5"), Err(DecodeError::BadLength("e2e4e5".to_string())));
        assert!(matches!(decode("z9e4"), Err(DecodeError::BadSquare(_))));
        assert!(matches!(decode("e7e8x"), Err(DecodeError::BadPromotion(_))));
    }

    #[test]
    fn encode_round_trips_the_promotion_letter() {
        assert_eq!(encode(ChessMove::new(Square::E2, Square::E4, None)), "e2e4");
        assert_eq!(
            encode(ChessMove::new(Square::E7, Square::E8, Some(Piece::Queen))),
            "e7e8q"
        );
    }

    #[test]
    fn replay_produces_san_for_an_opening() {
        assert_eq!(
            sans(&["e2e4", "e7e5", "g1f3", "b8c6", "f1b5"]),
            vec!["e4", "e5", "Nf3", "Nc6", "Bb5"]
        );
    }

    #[test]
    fn replay_marks_captures_and_tallies_them() {
        let replayed = replay(&coords(&["e2e4", "d7d5", "e4d5"]));
        assert_eq!(replayed.len(), 3);
        assert_eq!(replayed[2].san, "exd5");
        assert_eq!(replayed[2].mover, Color::White);
        assert_eq!(replayed[2].captured, Some(Piece::Pawn));
        assert_eq!(replayed[0].captured, None);
    }

    #[test]
    fn replay_counts_en_passant_as_a_pawn_capture() {
        let replayed = replay(&coords(&["e2e4", "a7a6", "e4e5", "d7d5", "e5d6"]));
        let last = replayed.last().unwrap();
        assert_eq!(last.san, "exd6");
        assert_eq!(last.captured, Some(Piece::Pawn));
    }

    #[test]
    fn replay_halts_on_a_malformed_entry() {
        assert_eq!(sans(&["e2e4", "zz", "e7e5"]), vec!["e4"]);
    }

    #[test]
    fn replay_halts_on_an_illegal_entry() {
        assert_eq!(sans(&["e2e4", "e2e4"]), vec!["e4"]);
    }

    #[test]
    fn san_appends_check_and_mate_suffixes() {
        assert_eq!(sans(&["e2e4", "f7f6", "d1h5"]), vec!["e4", "f6", "Qh5+"]);
        assert_eq!(
            sans(&["e2e4", "e7e5", "f1c4", "b8c6", "d1h5", "g8f6", "h5f7"]),
            vec!["e4", "e5", "Bc4", "Nc6", "Qh5", "Nf6", "Qxf7#"]
        );
    }

    #[test]
    fn san_disambiguates_by_file() {
        let board = Board::from_str("4k3/8/8/8/8/2N3N1/8/4K3 w - - 0 1").unwrap();
        let mv = ChessMove::new(Square::C3, Square::E4, None);
        assert_eq!(san(&board, mv), "Nce4");
    }

    #[test]
    fn san_renders_castling() {
        let board = Board::from_str("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        assert_eq!(san(&board, ChessMove::new(Square::E1, Square::G1, None)), "O-O");
        assert_eq!(san(&board, ChessMove::new(Square::E1, Square::C1, None)), "O-O-O");
    }

    #[test]
    fn san_renders_promotion() {
        let board = Board::from_str("8/4P3/8/8/8/8/2k5/4K3 w - - 0 1").unwrap();
        let mv = ChessMove::new(Square::E7, Square::E8, Some(Piece::Queen));
        assert_eq!(san(&board, mv), "e8=Q");
    }
}

use chess::{Board, Color, Piece};

/// Convert a chess color to its wire string.
pub fn color_to_string(color: Color) -> String {
    match color {
        Color::White => "white".to_string(),
        Color::Black => "black".to_string(),
    }
}

/// Parse a wire color string ("white"/"black").
pub fn color_from_str(text: &str) -> Option<Color> {
    match text {
        "white" => Some(Color::White),
        "black" => Some(Color::Black),
        _ => None,
    }
}

/// Lowercase letter for a piece, as used in captured-piece tallies and
/// promotion suffixes ("p", "n", "b", "r", "q", "k").
pub fn piece_letter(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    }
}

/// Check whether the board has insufficient material for either side to
/// deliver mate: K vs K, K+minor vs K, or K+B vs K+B with both bishops on
/// the same square color. The `chess` crate does not report this draw, so
/// the session evaluates it after every committed move.
pub fn has_insufficient_material(board: &Board) -> bool {
    // Any pawn, rook, or queen on the board is mating material.
    for piece in [Piece::Pawn, Piece::Rook, Piece::Queen] {
        if board.pieces(piece).popcnt() > 0 {
            return false;
        }
    }

    let bishops = *board.pieces(Piece::Bishop);
    let knights = *board.pieces(Piece::Knight);
    let white = *board.color_combined(Color::White);
    let black = *board.color_combined(Color::Black);

    let white_minors = (knights & white).popcnt() + (bishops & white).popcnt();
    let black_minors = (knights & black).popcnt() + (bishops & black).popcnt();

    // K vs K, or a lone minor piece against a bare king.
    if white_minors + black_minors <= 1 {
        return true;
    }

    // K+B vs K+B with bishops confined to squares of one color.
    if white_minors == 1 && black_minors == 1 {
        let white_bishops = bishops & white;
        let black_bishops = bishops & black;
        if white_bishops.popcnt() == 1 && black_bishops.popcnt() == 1 {
            return square_shade(white_bishops.to_square()) == square_shade(black_bishops.to_square());
        }
    }

    false
}

fn square_shade(square: chess::Square) -> usize {
    (square.get_rank().to_index() + square.get_file().to_index()) % 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn board(fen: &str) -> Board {
        Board::from_str(fen).unwrap()
    }

    #[test]
    fn bare_kings_are_insufficient() {
        assert!(has_insufficient_material(&board("4k3/8/8/8/8/8/8/4K3 w - - 0 1")));
    }

    #[test]
    fn lone_minor_is_insufficient() {
        assert!(has_insufficient_material(&board("4k3/8/8/8/8/8/8/4KB2 w - - 0 1")));
        assert!(has_insufficient_material(&board("4k3/8/8/8/8/8/8/4KN2 w - - 0 1")));
    }

    #[test]
    fn same_shade_bishops_are_insufficient() {
        // c1 and f8 are both dark squares.
        assert!(has_insufficient_material(&board("4kb2/8/8/8/8/8/8/2B1K3 w - - 0 1")));
    }

    #[test]
    fn opposite_shade_bishops_are_sufficient() {
        // c1 is dark, c8 is light.
        assert!(!has_insufficient_material(&board("2b1k3/8/8/8/8/8/8/2B1K3 w - - 0 1")));
    }

    #[test]
    fn a_single_pawn_is_sufficient() {
        assert!(!has_insufficient_material(&board("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1")));
    }

    #[test]
    fn starting_position_is_sufficient() {
        assert!(!has_insufficient_material(&Board::default()));
    }
}

//! The game session controller: single source of truth for one live game.
//!
//! The session owns the rules-engine instance, the coordinate move history,
//! the clock pair, and the terminal result. Every mutation of the game runs
//! through the methods here, which keeps the board, the clocks, and the
//! result mutually consistent no matter how player input, opponent
//! responses, and clock ticks interleave on the event queue.

use std::time::Instant;

use chess::{Board, BoardStatus, ChessMove, Color, Game, MoveGen, Piece, Rank, Square};
use thiserror::Error;

use crate::game::clock::ClockPair;
use crate::game::codec;
use crate::game::utils::has_insufficient_material;

/// Fixed time-control presets, no increment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeMode {
    Rapid,
    Bullet,
}

impl TimeMode {
    pub fn allowance_ms(self) -> u64 {
        match self {
            TimeMode::Rapid => 600_000,
            TimeMode::Bullet => 60_000,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeMode::Rapid => "rapid",
            TimeMode::Bullet => "bullet",
        }
    }

    pub fn parse(text: &str) -> Option<TimeMode> {
        match text {
            "rapid" => Some(TimeMode::Rapid),
            "bullet" => Some(TimeMode::Bullet),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Winner {
    White,
    Black,
    Draw,
}

impl Winner {
    pub fn of(color: Color) -> Winner {
        match color {
            Color::White => Winner::White,
            Color::Black => Winner::Black,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Winner::White => "white",
            Winner::Black => "black",
            Winner::Draw => "draw",
        }
    }
}

/// Why a game ended. Every engine-reported game over that is not checkmate
/// (stalemate, repetition, fifty-move, insufficient material) collapses to
/// `Draw`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    Checkmate,
    Timeout,
    Resignation,
    Draw,
}

impl EndReason {
    pub fn as_str(self) -> &'static str {
        match self {
            EndReason::Checkmate => "checkmate",
            EndReason::Timeout => "timeout",
            EndReason::Resignation => "resignation",
            EndReason::Draw => "draw",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameOutcome {
    pub winner: Winner,
    pub reason: EndReason,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Live,
    Finished(GameOutcome),
}

/// Rejection reasons for a local move. None of these mutate the session;
/// the UI snaps the piece back.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoveError {
    #[error("the game is already over")]
    GameOver,
    #[error("an opponent move request is outstanding")]
    RequestPending,
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("no piece of yours on the origin square")]
    NotYourPiece,
    #[error("illegal move")]
    Illegal,
}

/// Snapshot handed to the transport when an opponent move is requested.
/// The epoch pins the response to the game instance that asked for it.
pub struct EngineRequest {
    pub epoch: u64,
    pub moves: Vec<String>,
    pub mode: TimeMode,
}

/// A committed move, with the flags the UI layer turns into sounds and
/// highlights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    pub coord: String,
    pub capture: bool,
    pub check: bool,
    pub outcome: Option<GameOutcome>,
}

/// What happened when an opponent response was fed back into the session.
#[derive(Debug)]
pub enum EngineMoveDisposition {
    /// The move was valid and is now on the board.
    Committed(MoveRecord),
    /// Stale or out-of-order response; dropped without touching the game.
    Discarded,
    /// The provider answered with garbage or an illegal move; the request
    /// was abandoned and the clock handed back to the player.
    Faulted,
}

/// Clock values after a tick, plus the terminal outcome if this tick
/// flagged a side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSnapshot {
    pub white_ms: u64,
    pub black_ms: u64,
    pub outcome: Option<GameOutcome>,
}

pub struct GameSession {
    game: Game,
    history: Vec<String>,
    player_color: Color,
    time_mode: TimeMode,
    clock: ClockPair,
    status: SessionStatus,
    pending_request: bool,
    epoch: u64,
}

impl GameSession {
    pub fn new(player_color: Color, time_mode: TimeMode, now: Instant) -> Self {
        GameSession {
            game: Game::new(),
            history: Vec::new(),
            player_color,
            time_mode,
            clock: ClockPair::new(time_mode.allowance_ms(), now),
            status: SessionStatus::Live,
            pending_request: false,
            epoch: 0,
        }
    }

    pub fn player_color(&self) -> Color {
        self.player_color
    }

    pub fn engine_color(&self) -> Color {
        !self.player_color
    }

    pub fn time_mode(&self) -> TimeMode {
        self.time_mode
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        match self.status {
            SessionStatus::Live => None,
            SessionStatus::Finished(outcome) => Some(outcome),
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self.status, SessionStatus::Live)
    }

    pub fn turn(&self) -> Color {
        self.game.side_to_move()
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn position_fen(&self) -> String {
        self.game.current_position().to_string()
    }

    pub fn active_color(&self) -> Color {
        self.clock.active_color()
    }

    pub fn clock_ms(&self, color: Color) -> u64 {
        self.clock.remaining(color)
    }

    pub fn request_pending(&self) -> bool {
        self.pending_request
    }

    /// Whether the opening move belongs to the engine (the player took
    /// Black on a fresh board).
    pub fn engine_opens(&self) -> bool {
        self.is_live() && self.player_color == Color::Black && self.history.is_empty()
    }

    /// Validate and commit a move made by the local player. On success the
    /// turn and clock flip to the engine; the caller is expected to issue
    /// `begin_engine_request` next if the game is still live.
    pub fn apply_player_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<Piece>,
        now: Instant,
    ) -> Result<MoveRecord, MoveError> {
        if !self.is_live() {
            return Err(MoveError::GameOver);
        }
        if self.pending_request {
            return Err(MoveError::RequestPending);
        }
        if self.turn() != self.player_color {
            return Err(MoveError::NotYourTurn);
        }
        let board = self.game.current_position();
        if board.color_on(from) != Some(self.player_color) {
            return Err(MoveError::NotYourPiece);
        }
        let mv = ChessMove::new(from, to, resolve_promotion(&board, from, to, promotion));
        self.try_commit(mv, now).ok_or(MoveError::Illegal)
    }

    /// Mark an opponent move request as outstanding and return the payload
    /// for the wire. Refuses while the game is not live, while another
    /// request is outstanding, or while it is not the engine's move.
    pub fn begin_engine_request(&mut self) -> Option<EngineRequest> {
        if !self.is_live() || self.pending_request || self.turn() != self.engine_color() {
            return None;
        }
        self.pending_request = true;
        Some(EngineRequest {
            epoch: self.epoch,
            moves: self.history.clone(),
            mode: self.time_mode,
        })
    }

    /// Feed an opponent response back in. The epoch, status, and turn are
    /// re-checked before anything is applied: a response that raced with a
    /// reset, resignation, or flag fall is dropped without side effects.
    pub fn apply_engine_move(
        &mut self,
        epoch: u64,
        coord: &str,
        now: Instant,
    ) -> EngineMoveDisposition {
        if epoch != self.epoch {
            return EngineMoveDisposition::Discarded;
        }
        self.pending_request = false;
        if !self.is_live() || self.turn() != self.engine_color() {
            return EngineMoveDisposition::Discarded;
        }
        let mv = match codec::decode(coord) {
            Ok((from, to, promotion)) => ChessMove::new(from, to, promotion),
            Err(_) => {
                self.abandon_request(now);
                return EngineMoveDisposition::Faulted;
            }
        };
        match self.try_commit(mv, now) {
            Some(record) => EngineMoveDisposition::Committed(record),
            None => {
                self.abandon_request(now);
                EngineMoveDisposition::Faulted
            }
        }
    }

    /// The outstanding request failed in transport. Clears the busy flag
    /// and hands the clock back to the player; the board stays as it was.
    /// Returns false when the failure belongs to a previous game instance
    /// or the game has already ended.
    pub fn engine_request_failed(&mut self, epoch: u64, now: Instant) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.pending_request = false;
        if !self.is_live() {
            return false;
        }
        self.abandon_request(now);
        true
    }

    /// The local player resigns. Live games only.
    pub fn resign(&mut self) -> Option<GameOutcome> {
        if !self.is_live() {
            return None;
        }
        let outcome = GameOutcome {
            winner: Winner::of(self.engine_color()),
            reason: EndReason::Resignation,
        };
        self.finish(outcome);
        Some(outcome)
    }

    /// Rematch: fresh board, history, clocks, and status. Player identity,
    /// color, and time mode are kept. Bumps the epoch so that any response
    /// still in flight for the previous game is discarded on arrival.
    pub fn reset(&mut self, now: Instant) {
        self.game = Game::new();
        self.history.clear();
        self.clock = ClockPair::new(self.time_mode.allowance_ms(), now);
        self.status = SessionStatus::Live;
        self.pending_request = false;
        self.epoch += 1;
    }

    /// Periodic clock update. The first zero crossing finishes the game on
    /// time; after that the values are frozen.
    pub fn tick(&mut self, now: Instant) -> ClockSnapshot {
        let mut outcome = None;
        if self.is_live() {
            if let Some(flagged) = self.clock.tick(now) {
                let result = GameOutcome {
                    winner: Winner::of(!flagged),
                    reason: EndReason::Timeout,
                };
                self.finish(result);
                outcome = Some(result);
            }
        }
        ClockSnapshot {
            white_ms: self.clock.remaining(Color::White),
            black_ms: self.clock.remaining(Color::Black),
            outcome,
        }
    }

    fn try_commit(&mut self, mv: ChessMove, now: Instant) -> Option<MoveRecord> {
        let board = self.game.current_position();
        if !MoveGen::new_legal(&board).any(|m| m == mv) {
            return None;
        }
        let mover = board.side_to_move();
        let capture = codec::captured_piece(&board, mv).is_some();
        if !self.game.make_move(mv) {
            return None;
        }
        let coord = codec::encode(mv);
        self.history.push(coord.clone());
        let check = self.game.current_position().checkers().popcnt() > 0;

        let mut outcome = self.evaluate_terminal(mover);
        match outcome {
            Some(result) => self.finish(result),
            None => {
                // The handover charges the move time to the mover; if that
                // emptied their allowance the game ends on time instead.
                if let Some(flagged) = self.clock.hand_to(!mover, now) {
                    let result = GameOutcome {
                        winner: Winner::of(!flagged),
                        reason: EndReason::Timeout,
                    };
                    self.finish(result);
                    outcome = Some(result);
                }
            }
        }
        Some(MoveRecord {
            coord,
            capture,
            check,
            outcome,
        })
    }

    fn evaluate_terminal(&self, mover: Color) -> Option<GameOutcome> {
        let board = self.game.current_position();
        match board.status() {
            BoardStatus::Checkmate => Some(GameOutcome {
                winner: Winner::of(mover),
                reason: EndReason::Checkmate,
            }),
            BoardStatus::Stalemate => Some(GameOutcome {
                winner: Winner::Draw,
                reason: EndReason::Draw,
            }),
            BoardStatus::Ongoing => {
                if self.game.can_declare_draw() || has_insufficient_material(&board) {
                    Some(GameOutcome {
                        winner: Winner::Draw,
                        reason: EndReason::Draw,
                    })
                } else {
                    None
                }
            }
        }
    }

    fn finish(&mut self, outcome: GameOutcome) {
        self.status = SessionStatus::Finished(outcome);
        self.pending_request = false;
        self.clock.stop();
    }

    fn abandon_request(&mut self, now: Instant) {
        self.pending_request = false;
        if let Some(flagged) = self.clock.hand_to(self.player_color, now) {
            self.finish(GameOutcome {
                winner: Winner::of(!flagged),
                reason: EndReason::Timeout,
            });
        }
    }

    #[cfg(test)]
    fn with_board(board: Board, player_color: Color, time_mode: TimeMode, now: Instant) -> Self {
        let mut session = GameSession::new(player_color, time_mode, now);
        session.game = Game::new_with_board(board);
        session.clock.hand_to(session.game.side_to_move(), now);
        session
    }
}

/// Default-queen promotion: a pawn reaching the far rank promotes to the
/// requested piece, or to a queen when none was supplied. A promotion
/// argument on any other move is ignored.
fn resolve_promotion(
    board: &Board,
    from: Square,
    to: Square,
    requested: Option<Piece>,
) -> Option<Piece> {
    if board.piece_on(from) != Some(Piece::Pawn) {
        return None;
    }
    let far_rank = match board.side_to_move() {
        Color::White => Rank::Eighth,
        Color::Black => Rank::First,
    };
    if to.get_rank() == far_rank {
        Some(requested.unwrap_or(Piece::Queen))
    } else {
        None
    }
}

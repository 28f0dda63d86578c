use std::str::FromStr;
use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_web_actors::ws;
use chess::{Color, Square};
use log::{debug, info, warn};

use crate::game::codec;
use crate::game::session::{
    EngineMoveDisposition, GameOutcome, GameSession, MoveRecord, TimeMode,
};
use crate::game::utils::{color_from_str, color_to_string, piece_letter};
use crate::models::{ClientMessage, LastMove, ServerMessage};
use crate::provider::EngineMoveRequest;
use crate::websocket::handler::PlaySocket;

const CLOCK_TICK: Duration = Duration::from_millis(100);

impl PlaySocket {
    pub fn handle_start(&mut self, msg: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        if self.session.is_some() {
            self.send_error(ctx, "A game is already in progress");
            return;
        }

        let color = match msg.color.as_deref() {
            None => Color::White,
            Some(text) => match color_from_str(text) {
                Some(color) => color,
                None => {
                    self.send_error(ctx, &format!("Unknown color: {}", text));
                    return;
                }
            },
        };
        let mode = match msg.mode.as_deref() {
            None => TimeMode::Rapid,
            Some(text) => match TimeMode::parse(text) {
                Some(mode) => mode,
                None => {
                    self.send_error(ctx, &format!("Unknown time mode: {}", text));
                    return;
                }
            },
        };
        self.player_name = msg
            .player_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "Anonymous".to_string());

        let session = GameSession::new(color, mode, Instant::now());
        info!(
            "{} starts a {} game as {}",
            self.player_name,
            mode.as_str(),
            color_to_string(color)
        );

        let started = self.session_started_message(&session);
        self.session = Some(session);
        self.send(ctx, &started);

        self.start_clock(ctx);
        if self.session.as_ref().map_or(false, |s| s.engine_opens()) {
            self.dispatch_engine_request(ctx);
        }
    }

    pub fn handle_move(&mut self, msg: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        let (from_text, to_text) = match (msg.move_from.as_deref(), msg.move_to.as_deref()) {
            (Some(from), Some(to)) => (from, to),
            _ => {
                self.send_error(ctx, "A move needs move_from and move_to");
                return;
            }
        };
        let (from, to) = match (
            Square::from_str(&from_text.to_lowercase()),
            Square::from_str(&to_text.to_lowercase()),
        ) {
            (Ok(from), Ok(to)) => (from, to),
            _ => {
                self.send_error(ctx, &format!("Bad square in move {}{}", from_text, to_text));
                return;
            }
        };
        let promotion = msg
            .promotion
            .as_deref()
            .and_then(|text| text.chars().next())
            .and_then(codec::promotion_piece);

        let result = match self.session.as_mut() {
            Some(session) => session.apply_player_move(from, to, promotion, Instant::now()),
            None => {
                self.send_error(ctx, "No game in progress");
                return;
            }
        };

        match result {
            Ok(record) => {
                info!("{} played {}", self.player_name, record.coord);
                self.send_move_made(ctx, &record);
                match record.outcome {
                    Some(outcome) => self.send_game_over(ctx, outcome),
                    None => {
                        if record.check {
                            self.send_check(ctx);
                        }
                        self.dispatch_engine_request(ctx);
                    }
                }
            }
            Err(err) => {
                // Rejected moves leave the session untouched; the board
                // snaps back on the client.
                debug!("Rejected move from {}: {}", self.player_name, err);
                self.send_error(ctx, &err.to_string());
            }
        }
    }

    pub fn handle_resign(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        let outcome = match self.session.as_mut() {
            Some(session) => session.resign(),
            None => None,
        };
        match outcome {
            Some(outcome) => {
                info!("{} resigns", self.player_name);
                self.send_game_over(ctx, outcome);
            }
            None => self.send_error(ctx, "No live game to resign"),
        }
    }

    pub fn handle_rematch(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        match self.session.as_mut() {
            Some(session) => session.reset(Instant::now()),
            None => {
                self.send_error(ctx, "No game to restart");
                return;
            }
        }
        info!("{} starts a rematch", self.player_name);
        if let Some(session) = self.session.as_ref() {
            let started = self.session_started_message(session);
            self.send(ctx, &started);
        }

        self.start_clock(ctx);
        if self.session.as_ref().map_or(false, |s| s.engine_opens()) {
            self.dispatch_engine_request(ctx);
        }
    }

    /// Ask the provider for the engine's move. The epoch captured here pins
    /// the response to this game instance; by the time the future resolves
    /// the game may have been resigned, reset, or lost on time.
    pub fn dispatch_engine_request(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        let request = match self.session.as_mut() {
            Some(session) => session.begin_engine_request(),
            None => None,
        };
        let Some(request) = request else {
            return;
        };
        let epoch = request.epoch;
        info!(
            "Requesting engine move (epoch {}, {} moves played)",
            epoch,
            request.moves.len()
        );
        let wire = EngineMoveRequest {
            moves: request.moves,
            mode: request.mode.as_str().to_string(),
        };
        let fut = self.provider.request_move(wire);
        ctx.spawn(fut.into_actor(self).map(move |result, act, ctx| {
            match result {
                Ok(coord) => act.on_engine_move(epoch, coord, ctx),
                Err(err) => {
                    warn!("Engine move request failed: {}", err);
                    act.on_engine_failure(epoch, ctx);
                }
            }
        }));
    }

    fn on_engine_move(&mut self, epoch: u64, coord: String, ctx: &mut ws::WebsocketContext<Self>) {
        let disposition = match self.session.as_mut() {
            Some(session) => session.apply_engine_move(epoch, &coord, Instant::now()),
            None => return,
        };
        match disposition {
            EngineMoveDisposition::Committed(record) => {
                info!("Engine played {}", record.coord);
                self.send_move_made(ctx, &record);
                match record.outcome {
                    Some(outcome) => self.send_game_over(ctx, outcome),
                    None => {
                        if record.check {
                            self.send_check(ctx);
                        }
                    }
                }
            }
            EngineMoveDisposition::Discarded => {
                debug!("Discarded a stale engine response (epoch {})", epoch);
            }
            EngineMoveDisposition::Faulted => {
                warn!("Engine returned an unusable move {:?}", coord);
                self.send_fault_notice(ctx);
            }
        }
    }

    fn on_engine_failure(&mut self, epoch: u64, ctx: &mut ws::WebsocketContext<Self>) {
        let handled = match self.session.as_mut() {
            Some(session) => session.engine_request_failed(epoch, Instant::now()),
            None => false,
        };
        if handled {
            self.send_fault_notice(ctx);
        }
    }

    fn on_clock_tick(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        let snapshot = match self.session.as_mut() {
            Some(session) if session.is_live() => session.tick(Instant::now()),
            _ => return,
        };
        let message = ServerMessage {
            message_type: "clock".to_string(),
            white_ms: Some(snapshot.white_ms),
            black_ms: Some(snapshot.black_ms),
            ..ServerMessage::default()
        };
        self.send(ctx, &message);
        if let Some(outcome) = snapshot.outcome {
            info!("Game over on time");
            self.send_game_over(ctx, outcome);
        }
    }

    fn start_clock(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        if let Some(handle) = self.clock_timer.take() {
            ctx.cancel_future(handle);
        }
        self.clock_timer = Some(ctx.run_interval(CLOCK_TICK, |act, ctx| act.on_clock_tick(ctx)));
    }

    fn session_started_message(&self, session: &GameSession) -> ServerMessage {
        ServerMessage {
            message_type: "session_started".to_string(),
            fen: Some(session.position_fen()),
            color: Some(color_to_string(session.player_color())),
            mode: Some(session.time_mode().as_str().to_string()),
            turn: Some(color_to_string(session.turn())),
            white_ms: Some(session.clock_ms(Color::White)),
            black_ms: Some(session.clock_ms(Color::Black)),
            ..ServerMessage::default()
        }
    }

    fn send_move_made(&self, ctx: &mut ws::WebsocketContext<Self>, record: &MoveRecord) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let replayed = codec::replay(session.history());
        let mut san_moves = Vec::with_capacity(replayed.len());
        let mut captured_white = Vec::new();
        let mut captured_black = Vec::new();
        for m in &replayed {
            san_moves.push(m.san.clone());
            if let Some(piece) = m.captured {
                // A capture by White removes a black piece, and vice versa.
                match m.mover {
                    Color::White => captured_black.push(piece_letter(piece).to_string()),
                    Color::Black => captured_white.push(piece_letter(piece).to_string()),
                }
            }
        }

        let coord = &record.coord;
        let message = ServerMessage {
            message_type: "move_made".to_string(),
            fen: Some(session.position_fen()),
            turn: Some(color_to_string(session.turn())),
            last_move: Some(LastMove {
                from: coord[0..2].to_string(),
                to: coord[2..4].to_string(),
                coord: coord.clone(),
                capture: record.capture,
                check: record.check,
            }),
            san_moves: Some(san_moves),
            captured_white: Some(captured_white),
            captured_black: Some(captured_black),
            white_ms: Some(session.clock_ms(Color::White)),
            black_ms: Some(session.clock_ms(Color::Black)),
            ..ServerMessage::default()
        };
        self.send(ctx, &message);
    }

    fn send_check(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let message = ServerMessage {
            message_type: "check".to_string(),
            ..ServerMessage::default()
        };
        self.send(ctx, &message);
    }

    fn send_game_over(&mut self, ctx: &mut ws::WebsocketContext<Self>, outcome: GameOutcome) {
        let message = ServerMessage {
            message_type: "game_over".to_string(),
            winner: Some(outcome.winner.as_str().to_string()),
            reason: Some(outcome.reason.as_str().to_string()),
            white_ms: self.session.as_ref().map(|s| s.clock_ms(Color::White)),
            black_ms: self.session.as_ref().map(|s| s.clock_ms(Color::Black)),
            ..ServerMessage::default()
        };
        self.send(ctx, &message);
        if let Some(handle) = self.clock_timer.take() {
            ctx.cancel_future(handle);
        }
    }

    fn send_fault_notice(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let message = ServerMessage {
            message_type: "error".to_string(),
            error: Some("The engine did not answer; the clock is back on your side".to_string()),
            white_ms: Some(session.clock_ms(Color::White)),
            black_ms: Some(session.clock_ms(Color::Black)),
            ..ServerMessage::default()
        };
        self.send(ctx, &message);
    }
}

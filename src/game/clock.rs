use std::time::Instant;

use chess::Color;

/// Paired countdown clocks for one game.
///
/// Exactly one color is on the clock at a time. Time is charged by
/// wall-clock deltas between the instants the caller feeds in, never by a
/// fixed per-tick decrement, so scheduling jitter does not accumulate.
/// Callers inject `Instant`s, which keeps the pair deterministic in tests.
pub struct ClockPair {
    white_ms: u64,
    black_ms: u64,
    active: Color,
    running: bool,
    last_charge: Instant,
}

impl ClockPair {
    /// A fresh pair with the same allowance on both sides, White on the
    /// clock.
    pub fn new(allowance_ms: u64, now: Instant) -> Self {
        ClockPair {
            white_ms: allowance_ms,
            black_ms: allowance_ms,
            active: Color::White,
            running: true,
            last_charge: now,
        }
    }

    pub fn remaining(&self, color: Color) -> u64 {
        match color {
            Color::White => self.white_ms,
            Color::Black => self.black_ms,
        }
    }

    pub fn active_color(&self) -> Color {
        self.active
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Charge elapsed time to the active color. Returns the color whose
    /// allowance just hit zero, at most once per game: the pair stops on
    /// the first zero crossing and every later call is a no-op.
    pub fn tick(&mut self, now: Instant) -> Option<Color> {
        if !self.running {
            return None;
        }
        if self.charge(now) {
            self.running = false;
            return Some(self.active);
        }
        None
    }

    /// Put `color` on the clock, charging the time since the last update to
    /// the side that was running. If that charge empties the old side's
    /// allowance the handover does not happen and the flagged color is
    /// returned instead.
    pub fn hand_to(&mut self, color: Color, now: Instant) -> Option<Color> {
        if !self.running {
            return None;
        }
        if self.charge(now) {
            self.running = false;
            return Some(self.active);
        }
        self.active = color;
        None
    }

    /// Freeze both clocks. Terminal: the pair never runs again.
    pub fn stop(&mut self) {
        self.running = false;
    }

    fn charge(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_charge).as_millis() as u64;
        self.last_charge = now;
        let remaining = match self.active {
            Color::White => &mut self.white_ms,
            Color::Black => &mut self.black_ms,
        };
        *remaining = remaining.saturating_sub(elapsed);
        *remaining == 0
    }
}

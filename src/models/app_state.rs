use actix::Addr;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::websocket::handler::PlaySocket;

/// Application state shared between connections.
pub struct AppState {
    /// Endpoint of the opponent move-provider.
    pub provider_url: String,
    /// Connected play sockets by connection id, for lifecycle accounting.
    pub sessions: Mutex<HashMap<String, Addr<PlaySocket>>>,
}

impl AppState {
    pub fn new(provider_url: String) -> Self {
        AppState {
            provider_url,
            sessions: Mutex::new(HashMap::new()),
        }
    }
}

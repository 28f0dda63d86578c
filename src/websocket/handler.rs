use std::rc::Rc;

use actix::prelude::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::{info, warn};
use uuid::Uuid;

use crate::game::session::GameSession;
use crate::models::{AppState, ClientMessage, ServerMessage};
use crate::provider::{HttpMoveProvider, MoveProvider};

/// WebSocket actor owning one player's game session.
///
/// The actor mailbox is the event queue that linearizes everything touching
/// the session: client frames, opponent-move responses (re-entered through
/// `ctx.spawn`), and clock interval ticks all run here one at a time.
pub struct PlaySocket {
    pub id: String,
    pub app_state: web::Data<AppState>,
    pub player_name: String,
    pub session: Option<GameSession>,
    pub provider: Rc<dyn MoveProvider>,
    pub clock_timer: Option<SpawnHandle>,
}

impl Actor for PlaySocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        // Register the actor with the application state
        let addr = ctx.address();
        self.app_state
            .sessions
            .lock()
            .unwrap()
            .insert(self.id.clone(), addr);

        let total_sessions = self.app_state.sessions.lock().unwrap().len();
        info!("WebSocket connection started: {}", self.id);
        info!("Total active sessions: {}", total_sessions);
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        // The session dies with the connection; nothing is persisted.
        self.app_state.sessions.lock().unwrap().remove(&self.id);
        let total_sessions = self.app_state.sessions.lock().unwrap().len();
        info!("WebSocket connection closed: {}", self.id);
        info!("Total active sessions: {}", total_sessions);

        Running::Stop
    }
}

// WebSocket message handler
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for PlaySocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                // Do nothing for pong messages
            }
            Ok(ws::Message::Text(text)) => {
                match serde_json::from_str::<ClientMessage>(text.as_ref()) {
                    Ok(client_msg) => {
                        self.handle_message(client_msg, ctx);
                    }
                    Err(e) => {
                        warn!("Error parsing client message: {}", e);
                        self.send_error(ctx, &format!("Invalid message format: {}", e));
                    }
                }
            }
            Ok(ws::Message::Binary(_)) => {
                warn!("Binary messages are not supported");
                self.send_error(ctx, "Binary messages are not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                info!("Connection closed: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            _ => {
                ctx.stop();
            }
        }
    }
}

impl PlaySocket {
    pub fn handle_message(&mut self, msg: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        match msg.message_type.as_str() {
            "start" => self.handle_start(msg, ctx),
            "move" => self.handle_move(msg, ctx),
            "resign" => self.handle_resign(ctx),
            "rematch" => self.handle_rematch(ctx),
            _ => {
                warn!("Unknown message type: {}", msg.message_type);
                self.send_error(ctx, &format!("Unknown message type: {}", msg.message_type));
            }
        }
    }

    pub fn send(&self, ctx: &mut ws::WebsocketContext<Self>, message: &ServerMessage) {
        match serde_json::to_string(message) {
            Ok(text) => ctx.text(text),
            Err(e) => warn!("Error serializing server message: {}", e),
        }
    }

    pub fn send_error(&self, ctx: &mut ws::WebsocketContext<Self>, error: &str) {
        let message = ServerMessage {
            message_type: "error".to_string(),
            error: Some(error.to_string()),
            ..ServerMessage::default()
        };
        self.send(ctx, &message);
    }
}

/// WebSocket connection handler
pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let id = Uuid::new_v4().to_string();
    info!("New WebSocket connection: {}", id);

    let provider: Rc<dyn MoveProvider> =
        Rc::new(HttpMoveProvider::new(app_state.provider_url.clone()));
    let socket = PlaySocket {
        id,
        app_state: app_state.clone(),
        player_name: String::new(),
        session: None,
        provider,
        clock_timer: None,
    };

    ws::start(socket, &req, stream)
}

//! Client side of the opponent move-provider boundary: the session asks it
//! for one coordinate move given the history so far and the time mode.

use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request body for the provider endpoint.
#[derive(Serialize, Debug, Clone)]
pub struct EngineMoveRequest {
    pub moves: Vec<String>,
    pub mode: String,
}

/// Success body: one coordinate move.
#[derive(Deserialize, Debug)]
pub struct EngineMoveResponse {
    #[serde(rename = "move")]
    pub mv: String,
}

/// All provider failures are soft: the session clears its busy flag and
/// hands the clock back to the player, with no retry.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("provider returned status {0}")]
    BadStatus(u16),
    #[error("unusable response body: {0}")]
    BadBody(String),
}

/// Seam between the session socket and the wire. The production
/// implementation speaks HTTP; tests substitute a canned one.
pub trait MoveProvider {
    fn request_move(
        &self,
        request: EngineMoveRequest,
    ) -> LocalBoxFuture<'static, Result<String, ProviderError>>;
}

/// HTTP implementation over `awc`, POSTing JSON to the configured endpoint.
pub struct HttpMoveProvider {
    client: awc::Client,
    endpoint: String,
}

impl HttpMoveProvider {
    pub fn new(endpoint: String) -> Self {
        HttpMoveProvider {
            client: awc::Client::default(),
            endpoint,
        }
    }
}

impl MoveProvider for HttpMoveProvider {
    fn request_move(
        &self,
        request: EngineMoveRequest,
    ) -> LocalBoxFuture<'static, Result<String, ProviderError>> {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        Box::pin(async move {
            let mut response = client
                .post(endpoint.as_str())
                .send_json(&request)
                .await
                .map_err(|e| ProviderError::Transport(e.to_string()))?;
            if !response.status().is_success() {
                return Err(ProviderError::BadStatus(response.status().as_u16()));
            }
            let body: EngineMoveResponse = response
                .json()
                .await
                .map_err(|e| ProviderError::BadBody(e.to_string()))?;
            if body.mv.is_empty() {
                return Err(ProviderError::BadBody("empty move field".to_string()));
            }
            Ok(body.mv)
        })
    }
}

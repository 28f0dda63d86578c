use actix_web::{web, App, HttpServer};
use log::info;

mod game;
mod models;
mod provider;
mod routes;
mod websocket;

use models::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let provider_url =
        std::env::var("ENGINE_URL").unwrap_or_else(|_| "http://localhost:8000/move".to_string());

    info!("Starting chess arena server at http://{}", bind_addr);
    info!("Opponent move provider: {}", provider_url);

    // Create shared application state
    let app_state = web::Data::new(AppState::new(provider_url));

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .configure(routes::configure_routes)
    })
    .bind(bind_addr.as_str())?
    .run()
    .await
}

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

use services::TokenService;

/// Shared application state: the outbound HTTP client, where the REST
/// backend lives, and the token service.
#[derive(Clone)]
pub struct AppState {
    pub http: reqwest::Client,
    pub backend_url: String,
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(http: reqwest::Client, backend_url: impl Into<String>, tokens: TokenService) -> Self {
        Self {
            http,
            backend_url: backend_url.into(),
            tokens,
        }
    }
}

// API server implementation using actix-web

use crate::api::{auth, handlers, middleware, routes, state::AppState};
use crate::util::env as env_util;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};

pub struct ApiServer {
    pub host: String,
    pub port: u16,
    pub token_secret: String,
    pub allowed_origins: String,
    pub log_dir: String,
}

impl ApiServer {
    /// Create server from environment variables
    pub fn from_env() -> Result<Self> {
        env_util::preflight_check(
            "api_server",
            &["TOKEN_SECRET"],
            &[
                "API_HOST",
                "API_PORT",
                "ALLOWED_ORIGINS",
                "APP_ENV",
                "LOG_DIR",
                "DATABASE_URL",
                "SCRAPE_SOURCES_PATH",
                "TOKEN_SECRET",
            ],
        )?;

        let host = env_util::env_opt("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = env_util::env_opt("API_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse()
            .context("Invalid API_PORT")?;
        let token_secret = env_util::env_req("TOKEN_SECRET")?;
        let allowed_origins = env_util::env_opt("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string());
        let log_dir = env_util::env_opt("LOG_DIR").unwrap_or_else(|| "/logs".to_string());

        Ok(Self {
            host,
            port,
            token_secret,
            allowed_origins,
            log_dir,
        })
    }

    /// Start the HTTP server
    pub async fn run(self, state: AppState) -> Result<()> {
        let bind_addr = format!("{}:{}", self.host, self.port);

        tracing::info!(
            host = %self.host,
            port = %self.port,
            log_dir = %state.client_log.dir().display(),
            "Starting price-search API server"
        );

        let state = web::Data::new(state);
        let verifier = auth::TokenVerifier::new(&self.token_secret);
        let allowed_origins = self.allowed_origins.clone();

        HttpServer::new(move || {
            let (logger, compress) = middleware::setup_middleware();
            let cors = middleware::setup_cors(&allowed_origins);
            let auth = auth::Auth::new(verifier.clone());

            App::new()
                .app_data(state.clone())
                .wrap(auth)
                .wrap(cors)
                .wrap(compress)
                .wrap(logger)
                .configure(routes::configure_routes)
                .default_service(web::to(handlers::not_found))
        })
        .bind(&bind_addr)
        .with_context(|| format!("Failed to bind to {}", bind_addr))?
        .run()
        .await
        .context("HTTP server error")?;

        Ok(())
    }
}

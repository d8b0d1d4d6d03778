// API route configuration

use crate::api::handlers;
use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Health check (no auth required)
        .route("/health", web::get().to(handlers::health_check))
        .service(
            web::scope("/api")
                // Product search (public)
                .route("/search", web::get().to(handlers::search))
                .route("/search", web::post().to(handlers::search))
                // Basket (client token required, see auth::PROTECTED_PATHS)
                .route("/add_item", web::post().to(handlers::add_item)),
        );
}

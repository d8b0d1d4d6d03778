// HTTP request handlers for API endpoints

use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};

use crate::api::auth::ClientId;
use crate::api::error::ApiError;
use crate::api::models::*;
use crate::api::state::AppState;
use crate::database_ops::models::Product;
use crate::normalization::SearchTerm;

/// Health check endpoint
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let database = match state.retrieval.store().ping().await {
        Ok(()) => "connected",
        Err(e) => {
            tracing::warn!(error = %e, "health check could not reach database");
            "disconnected"
        }
    };

    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        database: database.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Search products by term; a form field wins over the query string.
pub async fn search(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let form = if req.content_type() == "application/x-www-form-urlencoded" {
        SearchParams::from_urlencoded(&body).search_term
    } else {
        None
    };
    let raw = form
        .or_else(|| SearchParams::from_urlencoded(req.query_string().as_bytes()).search_term)
        .unwrap_or_default();
    let term = SearchTerm::normalize(&raw);
    tracing::info!(
        raw = %raw,
        term = %term,
        exact = term.is_exact_phrase(),
        "search requested"
    );

    let retrieved = state.retrieval.retrieve(&term).await.map_err(|e| {
        tracing::error!(term = %term, error = %e, "failed to get products");
        ApiError::Search
    })?;
    let currency = state.currency.rates().await;

    Ok(HttpResponse::Ok().json(SearchResponse {
        results: retrieved.products,
        currency,
    }))
}

/// Add a product to the authenticated client's basket
pub async fn add_item(
    state: web::Data<AppState>,
    req: HttpRequest,
    client: ClientId,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    state
        .client_log
        .record(client.as_str(), &format!("Request: {}", req.path()))
        .await;

    let product: Product = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(client_id = %client.as_str(), error = %e, "failed to parse product");
        ApiError::BadProduct
    })?;

    state
        .baskets
        .add_to_basket(client.as_str(), &product)
        .await
        .map_err(|e| {
            tracing::error!(client_id = %client.as_str(), error = %e, "failed to add item");
            ApiError::AddItem
        })?;

    tracing::info!(client_id = %client.as_str(), url = %product.url, "item added to basket");
    Ok(HttpResponse::Ok().finish())
}

/// Fallback for unknown paths.
pub async fn not_found(req: HttpRequest) -> Result<HttpResponse, ApiError> {
    tracing::warn!(path = req.path(), method = %req.method(), "invalid request");
    Err(ApiError::NotFound)
}

use std::sync::Arc;

use axum::extract::{Path, Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use locker_core::models::{BatchResult, ClientChange, ItemOperation, ItemUpdate};
use locker_core::{
    Conflict, ConflictId, DatabaseConflictStore, HttpItemClient, Item, ItemClient, ItemId,
    ItemService, LocalItemClient, ResolutionStrategy, SyncService, UserId,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::verify_service_token;
use crate::config::AppConfig;
use crate::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    items: ItemService,
    sync: SyncService,
}

impl AppState {
    /// Wire the services; sync reaches items over HTTP when a remote URL is configured.
    pub fn new(
        config: Arc<AppConfig>,
        items: ItemService,
        conflicts: DatabaseConflictStore,
    ) -> locker_core::Result<Self> {
        let client: Arc<dyn ItemClient> = match config.items_service_url.as_deref() {
            Some(url) => Arc::new(HttpItemClient::new(
                url,
                config.remote_timeout,
                config.items_api_token.clone(),
            )?),
            None => Arc::new(LocalItemClient::new(items.clone())),
        };

        Ok(Self {
            sync: SyncService::new(client, Arc::new(conflicts)),
            items,
            config,
        })
    }
}

pub fn app_router(state: AppState) -> Router {
    let item_routes = Router::new()
        .route("/users/{user_id}/items", get(list_items))
        .route("/users/{user_id}/items/batch", post(batch_items))
        .route("/users/{user_id}/items/{item_id}", put(update_item))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_service_token,
        ));

    let sync_routes = Router::new()
        .route("/users/{user_id}/sync", post(sync_data))
        .route("/users/{user_id}/conflicts", get(list_conflicts))
        .route(
            "/users/{user_id}/conflicts/{conflict_id}/resolve",
            post(resolve_conflict),
        );

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/v1", item_routes.merge(sync_routes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}

async fn require_service_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    verify_service_token(request.headers(), state.config.items_api_token.as_deref())?;
    Ok(next.run(request).await)
}

async fn list_items(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Item>>, AppError> {
    let user_id = UserId::new(user_id)?;
    Ok(Json(state.items.list(&user_id).await?))
}

async fn update_item(
    State(state): State<AppState>,
    Path((user_id, item_id)): Path<(String, String)>,
    Json(update): Json<ItemUpdate>,
) -> Result<Json<Item>, AppError> {
    let user_id = UserId::new(user_id)?;
    let item_id = item_id
        .parse::<ItemId>()
        .map_err(|_| AppError::bad_request(format!("invalid item id: {item_id}")))?;
    if update.id != item_id {
        return Err(AppError::bad_request("item id in body does not match path"));
    }

    let item = state.items.update(&user_id, &update).await?;
    tracing::info!(
        endpoint = "items_update",
        user = user_id.fingerprint(),
        item = %item.id,
        "Updated item"
    );
    Ok(Json(item))
}

async fn batch_items(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(operations): Json<Vec<ItemOperation>>,
) -> Result<Json<Vec<BatchResult>>, AppError> {
    let user_id = UserId::new(user_id)?;
    let results = state.items.batch_process(&user_id, operations).await?;
    tracing::info!(
        endpoint = "items_batch",
        user = user_id.fingerprint(),
        operations = results.len(),
        "Applied item batch"
    );
    Ok(Json(results))
}

#[derive(Debug, Deserialize)]
struct SyncRequest {
    changes: Vec<ClientChange>,
}

#[derive(Debug, Serialize)]
struct SyncResponse {
    conflicts: Vec<Conflict>,
}

async fn sync_data(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<SyncRequest>,
) -> Result<Json<SyncResponse>, AppError> {
    let user_id = UserId::new(user_id)?;
    let conflicts = state.sync.sync_data(&user_id, &request.changes).await?;
    Ok(Json(SyncResponse { conflicts }))
}

async fn list_conflicts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Conflict>>, AppError> {
    let user_id = UserId::new(user_id)?;
    Ok(Json(state.sync.list_conflicts(&user_id).await?))
}

#[derive(Debug, Deserialize)]
struct ResolveRequest {
    strategy: String,
}

#[derive(Debug, Serialize)]
struct ResolveResponse {
    message: String,
}

async fn resolve_conflict(
    State(state): State<AppState>,
    Path((user_id, conflict_id)): Path<(String, String)>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>, AppError> {
    let user_id = UserId::new(user_id)?;
    let conflict_id = conflict_id
        .parse::<ConflictId>()
        .map_err(|_| AppError::bad_request(format!("invalid conflict id: {conflict_id}")))?;
    let strategy = request.strategy.parse::<ResolutionStrategy>()?;

    state
        .sync
        .resolve_conflict(&user_id, &conflict_id, strategy)
        .await?;
    Ok(Json(ResolveResponse {
        message: format!("conflict resolved with {strategy}"),
    }))
}

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::info;

use super::AdminState;

#[derive(Debug, Serialize)]
struct CacheClearResponse {
    cleared: usize,
}

pub(super) async fn clear_index_cache(State(state): State<AdminState>) -> Response {
    let cleared = state.index_cache.clear().await;
    info!(
        target = "yatube::http::admin::cache",
        cleared, "index cache cleared"
    );
    Json(CacheClearResponse { cleared }).into_response()
}

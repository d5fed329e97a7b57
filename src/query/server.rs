use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::IndexError;
use crate::index::DatasetHandle;
use crate::stats::IndexReport;

#[derive(Deserialize)]
pub struct TableParams {
    /// 逗号分隔；缺省为全部已注册列
    pub columns: Option<String>,
}

pub struct QueryServer {
    pub handle: Arc<DatasetHandle>,
}

impl QueryServer {
    pub fn new(handle: Arc<DatasetHandle>) -> Self {
        Self { handle }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/indices", get(indices_handler))
            .route("/status", get(status_handler))
            .with_state(self.handle.clone())
    }

    pub async fn run(self, port: u16) -> anyhow::Result<()> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
        tracing::info!("HTTP Query Server listening on port {}", port);
        axum::serve(listener, app).await?;
        Ok(())
    }
}

fn status_for(err: &IndexError) -> StatusCode {
    match err {
        IndexError::NotFound(_) => StatusCode::NOT_FOUND,
        IndexError::NotLoaded(_) => StatusCode::CONFLICT,
        IndexError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        IndexError::Corrupt { .. } | IndexError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn indices_handler(
    Query(params): Query<TableParams>,
    State(handle): State<Arc<DatasetHandle>>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let requested: Option<Vec<&str>> = params.columns.as_deref().map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect()
    });

    handle
        .indices_as_table(requested.as_deref())
        .map(|table| Json(table.to_json()))
        .map_err(|e| (status_for(&e), e.to_string()))
}

async fn status_handler(State(handle): State<Arc<DatasetHandle>>) -> Json<IndexReport> {
    Json(IndexReport::from_snapshot(&handle.snapshot()))
}

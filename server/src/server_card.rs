//! `GET /.well-known/mcp/server-card.json`: the static discovery document.
//!
//! The file is read on every request so a redeployed card is picked up
//! without a restart.

use std::io;
use std::path::{Path, PathBuf};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use thiserror::Error;

use crate::error::ErrorBody;
use crate::AppState;

#[derive(Debug, Error)]
pub enum CardError {
    #[error("server card not found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read server card: {0}")]
    Read(#[from] io::Error),

    #[error("server card is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

impl IntoResponse for CardError {
    fn into_response(self) -> Response {
        match self {
            CardError::NotFound(_) => {
                (StatusCode::NOT_FOUND, Json(ErrorBody::new("Server card not found"))).into_response()
            }
            CardError::Read(_) | CardError::Parse(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new("Failed to load server card")),
            )
                .into_response(),
        }
    }
}

pub async fn serve(State(state): State<AppState>) -> Response {
    match load(&state.server_card_path).await {
        Ok(card) => Json(card).into_response(),
        Err(err) => {
            match &err {
                CardError::NotFound(_) => tracing::error!("{err}"),
                _ => tracing::error!(error = %err, "error serving server card"),
            }
            err.into_response()
        }
    }
}

pub async fn load(path: &Path) -> Result<Value, CardError> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(CardError::NotFound(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_slice(&raw)?)
}

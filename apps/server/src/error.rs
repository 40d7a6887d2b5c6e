use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tickerlens_market_data::MarketDataError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    MarketData(#[from] MarketDataError),
    #[error("Upstream did not answer within {0:?}")]
    UpstreamDeadline(Duration),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MarketData(e) => match e {
                MarketDataError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                MarketDataError::SymbolNotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::UpstreamDeadline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message for the response body. Validation failures carry their bare reason.
    pub fn message(&self) -> String {
        match self {
            ApiError::MarketData(MarketDataError::InvalidInput(reason)) => reason.clone(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        let body = Json(ErrorBody {
            error: self.message(),
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

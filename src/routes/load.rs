//! Load generation handlers.
//!
//! Both handlers push the Fibonacci work onto tokio's blocking pool so a burst
//! of load requests cannot starve the reactor that answers health checks.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::AppError;
use crate::load::{fibonacci, run_batch};
use crate::routes::{first_value, QueryPairs};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LoadResponse {
    pub result: u64,
}

/// Body of `POST /generate-load`.
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub processed_requests: u64,
}

/// Parse `n`: present, a base-10 integer, non-negative and at most `max_n`.
pub fn parse_n(raw: Option<&str>, max_n: u64) -> Result<u64, AppError> {
    let raw = raw
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("Missing 'n' query parameter".into()))?;

    let n: i64 = raw
        .parse()
        .map_err(|_| AppError::InvalidRequest("Invalid n".into()))?;

    let n = u64::try_from(n)
        .map_err(|_| AppError::InvalidRequest("n must be non-negative".into()))?;

    if n > max_n {
        return Err(AppError::InvalidRequest(format!(
            "n must be at most {max_n}"
        )));
    }

    Ok(n)
}

async fn on_blocking_pool<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(format!("load worker failed: {e}")))
}

/// Handler for `GET /generate-load?n=<int>`.
#[instrument(name = "load::generate", skip(state, query))]
pub async fn generate(
    State(state): State<AppState>,
    query: Result<Query<QueryPairs>, QueryRejection>,
) -> Result<Json<LoadResponse>, AppError> {
    let Query(pairs) = query.map_err(|_| AppError::InvalidRequest("Invalid n".into()))?;
    let n = parse_n(first_value(&pairs, "n"), state.config.load.max_n)?;

    let result = on_blocking_pool(move || fibonacci(n)).await?;
    tracing::info!(n, result, "Generated load");

    Ok(Json(LoadResponse { result }))
}

/// Handler for `POST /generate-load` with `{"count": <int>}`.
#[instrument(name = "load::generate_batch", skip(state, payload))]
pub async fn generate_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<BatchResponse>, AppError> {
    let Json(request) =
        payload.map_err(|e| AppError::InvalidRequest(format!("Invalid request body: {e}")))?;

    let limits = &state.config.load;
    if request.count > limits.max_batch_count {
        return Err(AppError::InvalidRequest(format!(
            "count must be at most {}",
            limits.max_batch_count
        )));
    }

    let (count, n) = (request.count, limits.batch_n);
    let processed_requests = on_blocking_pool(move || run_batch(count, n)).await?;
    tracing::info!(count, n, processed_requests, "Generated batch load");

    Ok(Json(BatchResponse { processed_requests }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_n_accepts_range() {
        assert_eq!(parse_n(Some("0"), 93).unwrap(), 0);
        assert_eq!(parse_n(Some("93"), 93).unwrap(), 93);
    }

    #[test]
    fn parse_n_rejects_negative() {
        let err = parse_n(Some("-1"), 93).unwrap_err();
        assert_eq!(err.to_string(), "n must be non-negative");
    }

    #[test]
    fn parse_n_rejects_above_limit() {
        assert!(matches!(
            parse_n(Some("31"), 30),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[test]
    fn parse_n_rejects_missing_and_garbage() {
        assert_eq!(
            parse_n(None, 93).unwrap_err().to_string(),
            "Missing 'n' query parameter"
        );
        assert_eq!(parse_n(Some("ten"), 93).unwrap_err().to_string(), "Invalid n");
        assert_eq!(parse_n(Some("2.5"), 93).unwrap_err().to_string(), "Invalid n");
    }

    #[test]
    fn batch_response_uses_camel_case() {
        let json = serde_json::to_value(BatchResponse {
            processed_requests: 3,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "processedRequests": 3 }));
    }
}

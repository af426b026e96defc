//! Parity check handler.

use axum::{
    extract::{rejection::QueryRejection, Query},
    Json,
};
use serde::Serialize;
use tracing::instrument;

use crate::error::AppError;
use crate::routes::{first_value, QueryPairs};

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ParityResponse {
    pub is_even: bool,
}

/// Truncating remainder: `-3 % 2 == -1`, so negative odd numbers are odd.
pub fn number_is_even(number: i64) -> bool {
    number % 2 == 0
}

/// Parse the `number` parameter as a signed base-10 integer.
pub fn parse_number(raw: Option<&str>) -> Result<i64, AppError> {
    let raw = raw
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("Missing 'number' query parameter".into()))?;

    raw.parse()
        .map_err(|_| AppError::InvalidRequest("Invalid number".into()))
}

/// Handler for `GET /iseven?number=<int>`.
#[instrument(name = "parity::is_even", skip(query))]
pub async fn is_even(
    query: Result<Query<QueryPairs>, QueryRejection>,
) -> Result<Json<ParityResponse>, AppError> {
    let Query(pairs) = query.map_err(|_| AppError::InvalidRequest("Invalid number".into()))?;
    let number = parse_number(first_value(&pairs, "number"))?;

    Ok(Json(ParityResponse {
        is_even: number_is_even(number),
    }))
}

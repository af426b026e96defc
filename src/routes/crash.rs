//! Fault injection: deliberately crash the backend.
//!
//! The handler never exits by itself. It returns a body that reports when the
//! HTTP layer has released it and leaves the exit to the detached task spawned
//! by [`ProcessLifecycle::terminate_after`](crate::fault::ProcessLifecycle::terminate_after).

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use tracing::instrument;

use crate::config::CRASH_MESSAGE;
use crate::fault::delivery_tracked_body;
use crate::state::AppState;

fn crash_payload() -> Bytes {
    Bytes::from(serde_json::json!({ "message": CRASH_MESSAGE }).to_string())
}

fn json_response(body: Body, len: usize) -> Response {
    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (CONTENT_LENGTH, HeaderValue::from(len)),
        ],
        body,
    )
        .into_response()
}

/// Handler for `GET|POST /crash-backend`.
///
/// Always answers 200. Only the request that moves the process out of `Alive`
/// schedules the exit; repeats while terminating get the same answer.
#[instrument(name = "crash::crash", skip(state))]
pub async fn crash(State(state): State<AppState>) -> Response {
    let payload = crash_payload();
    let len = payload.len();

    if !state.lifecycle.begin_termination() {
        tracing::info!("Crash already in progress");
        return json_response(Body::from(payload), len);
    }

    tracing::warn!(
        delay_ms = state.lifecycle.delay().as_millis() as u64,
        exit_code = state.config.fault.exit_code,
        "Crash requested, exiting once the response is delivered"
    );

    let (body, delivered) = delivery_tracked_body(payload);
    state.lifecycle.terminate_after(delivered);

    json_response(body, len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::fault::LifecycleState;
    use crate::testing::recording_state;
    use http_body_util::BodyExt;
    use std::time::Duration;

    fn fast_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.fault.crash_delay_ms = 10;
        config
    }

    #[test]
    fn payload_is_the_crash_message() {
        let value: serde_json::Value = serde_json::from_slice(&crash_payload()).unwrap();
        assert_eq!(value, serde_json::json!({ "message": "Backend will crash now" }));
    }

    #[tokio::test]
    async fn exit_waits_for_body_to_be_released() {
        let (state, terminator) = recording_state(fast_config());

        let response = crash(State(state.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.lifecycle.state(), LifecycleState::Terminating);

        // Body still held: nothing may happen, however long we wait.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(terminator.exit_codes().is_empty());

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.len(), crash_payload().len());

        let code = terminator.wait_for_exit(Duration::from_secs(1)).await;
        assert_eq!(code, Some(1));
        assert_eq!(state.lifecycle.state(), LifecycleState::Terminated);
    }

    #[tokio::test]
    async fn repeated_crash_schedules_one_exit() {
        let (state, terminator) = recording_state(fast_config());

        let first = crash(State(state.clone())).await;
        let second = crash(State(state.clone())).await;
        assert_eq!(second.status(), StatusCode::OK);

        let second_body = second.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(second_body, crash_payload());
        drop(first);

        terminator.wait_for_exit(Duration::from_secs(1)).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(terminator.exit_codes(), vec![1]);
    }
}

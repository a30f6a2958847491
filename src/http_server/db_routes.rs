//! Fact Log HTTP Routes
//!
//! The whole wire surface, one route pair:
//! - `GET  /{db}`        — snapshot: `{"age": N, "state": {...}}`
//! - `GET  /{db}/{n}`    — fact n as plain text; one past the end long-polls
//! - `GET  /{db}/{n}..`  — facts n onward as a JSON array of strings
//! - `PUT  /{db}/{n}`    — record the body as fact n; empty 200 on success
//!
//! JSON and error bodies carry a trailing newline; fact bodies do not.
//! Positions that do not parse are unmatched routes, not bad requests:
//! a read names the db in its 404, a record answers the bare fallback.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, error};

use crate::db::{DbError, Fact, FactRead, Factlog};

// ==================
// Shared State
// ==================

/// State shared across fact log handlers.
pub struct AppState {
    pub db: Arc<Factlog>,
    /// How long a long-poll read may park before a 204. `None` parks
    /// forever, which is the wire contract's default.
    pub long_poll: Option<Duration>,
}

// ==================
// Routes
// ==================

/// Create the fact log routes.
pub fn db_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/{db}", get(db_state_handler))
        .route(
            "/{db}/{position}",
            get(read_fact_handler).put(record_fact_handler),
        )
        .fallback(no_route_handler)
        .method_not_allowed_fallback(invalid_method_handler)
        .with_state(state)
}

// ==================
// Position Parsing
// ==================

/// A position path segment: `5` addresses fact 5, `5..` facts 5 onward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    One(u64),
    Since(u64),
}

/// Parse a position segment. `None` means the segment is not a position
/// at all and the path matches no route.
pub fn parse_position(raw: &str) -> Option<Position> {
    match raw.strip_suffix("..") {
        Some(start) => parse_number(start).map(Position::Since),
        None => parse_number(raw).map(Position::One),
    }
}

fn parse_number(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

// ==================
// Handlers
// ==================

async fn db_state_handler(
    State(state): State<Arc<AppState>>,
    Path(db): Path<String>,
) -> Response {
    match state.db.snapshot(&db).await {
        Ok(snapshot) => json_reply(&snapshot),
        Err(e) => error_reply(&db, &e),
    }
}

async fn read_fact_handler(
    State(state): State<Arc<AppState>>,
    Path((db, position)): Path<(String, String)>,
) -> Response {
    match parse_position(&position) {
        Some(Position::Since(from)) => match state.db.facts_since(&db, from).await {
            Ok(facts) => json_reply(&facts),
            Err(e) => error_reply(&db, &e),
        },
        Some(Position::One(number)) => match state.db.fact_at(&db, number).await {
            Ok(FactRead::Ready(fact)) => fact.into_string().into_response(),
            Ok(FactRead::Wait(rx)) => await_next_fact(rx, state.long_poll).await,
            Err(e) => error_reply(&db, &e),
        },
        None => no_such_route(&db),
    }
}

async fn record_fact_handler(
    State(state): State<Arc<AppState>>,
    Path((db, position)): Path<(String, String)>,
    body: String,
) -> Response {
    let number = match parse_position(&position) {
        Some(Position::One(number)) => number,
        _ => return nope_reply(),
    };
    match state.db.append(&db, number, Fact::new(body)).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_reply(&db, &e),
    }
}

/// Park on the waiter channel, bounded by the configured limit. A timed
/// out poll answers 204 so the caller knows to simply ask again.
async fn await_next_fact(rx: oneshot::Receiver<Fact>, limit: Option<Duration>) -> Response {
    let outcome = match limit {
        None => rx.await,
        Some(limit) => match tokio::time::timeout(limit, rx).await {
            Ok(outcome) => outcome,
            Err(_elapsed) => return StatusCode::NO_CONTENT.into_response(),
        },
    };
    match outcome {
        Ok(fact) => fact.into_string().into_response(),
        Err(_closed) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "log went away while waiting\n".to_string(),
        )
            .into_response(),
    }
}

async fn no_route_handler() -> Response {
    (StatusCode::NOT_FOUND, "don't know\n".to_string()).into_response()
}

async fn invalid_method_handler() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        "invalid method\n".to_string(),
    )
        .into_response()
}

fn no_such_route(db: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        format!("no such route for db {db}\n"),
    )
        .into_response()
}

/// The record surface has exactly one shape; anything else answers the
/// bare fallback.
fn nope_reply() -> Response {
    (StatusCode::NOT_FOUND, "Nope.\n".to_string()).into_response()
}

/// Compact JSON plus the trailing newline the wire contract carries.
fn json_reply<T: Serialize>(value: &T) -> Response {
    match serde_json::to_string(value) {
        Ok(body) => (
            [(header::CONTENT_TYPE, "application/json")],
            body + "\n",
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("encoding failed: {e}\n"),
        )
            .into_response(),
    }
}

fn error_reply(db: &str, error: &DbError) -> Response {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if error.is_server_error() {
        error!(db, %error, "request failed");
    } else {
        debug!(db, %error, "request refused");
    }
    (status, format!("{error}\n")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_parse_like_the_wire_contract() {
        assert_eq!(parse_position("5"), Some(Position::One(5)));
        assert_eq!(parse_position("0"), Some(Position::One(0)));
        assert_eq!(parse_position("5.."), Some(Position::Since(5)));
        assert_eq!(parse_position("05"), Some(Position::One(5)));
    }

    #[test]
    fn non_positions_match_no_route() {
        for raw in [
            "", "..", "5.", "5...", "abc", "5a", "-1", "+5", " 5", "5 ", "1e3",
        ] {
            assert_eq!(parse_position(raw), None, "{raw:?}");
        }
    }

    #[test]
    fn absurdly_large_positions_match_no_route() {
        // Past u64 there is no fact number to speak of.
        assert_eq!(parse_position("99999999999999999999999999"), None);
    }
}

//! REST status endpoint, modeled directly on the teacher's `web.rs`: plain
//! async handlers over a shared `Arc<Mutex<_>>`, and a `handle_rejection`
//! that turns warp's rejection types into a JSON error body.

use std::convert::Infallible;
use std::sync::Arc;

use opensand_core::prelude::Counters;
use serde::Serialize;
use tokio::sync::Mutex;
use warp::http::StatusCode;
use warp::{Rejection, Reply};

use crate::blocks::StatusSnapshot;

#[derive(Debug, Serialize)]
struct CountersBody {
    counters: Vec<(&'static str, u64)>,
}

pub async fn counters(counters: &Arc<Counters>) -> Result<warp::reply::Json, Infallible> {
    Ok(warp::reply::json(&CountersBody {
        counters: counters.snapshot(),
    }))
}

pub async fn status(status: &Arc<Mutex<StatusSnapshot>>) -> Result<warp::reply::Json, Infallible> {
    let snap = status.lock().await;
    Ok(warp::reply::json(&*snap))
}

#[derive(Debug, Serialize)]
struct ErrorMessage {
    code: u16,
    message: String,
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "method not allowed".to_string(),
        )
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "invalid query".to_string())
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "unhandled rejection".to_string(),
        )
    };

    let json = warp::reply::json(&ErrorMessage {
        code: code.as_u16(),
        message,
    });
    Ok(warp::reply::with_status(json, code))
}

//! HTTP scoring service: `POST /calculate_distance` and a `GET /` health check.

use std::net::SocketAddr;

use warp::{
    Filter,
    http::StatusCode,
    hyper::body::Bytes,
    reply::{self, Reply, Response},
};

use crate::{
    Error, Result,
    dispatch::Cancellation,
    geometry::PathGeometry,
    oracle::wire::{City, ErrorResponse, HealthResponse, ScoreRequest, ScoreResponse},
};

pub fn routes() -> impl Filter<Extract = (Response,), Error = warp::Rejection> + Clone {
    let calculate = warp::path("calculate_distance")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::bytes())
        .map(|body: Bytes| calculate_distance(&body));

    let health = warp::path::end().and(warp::get()).map(|| {
        reply::json(&HealthResponse {
            status: "ok".to_string(),
        })
        .into_response()
    });

    calculate.or(health).unify()
}

fn calculate_distance(body: &[u8]) -> Response {
    let request: ScoreRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(err) => {
            log::debug!("service: rejected body err={err}");
            return error_reply(format!("invalid request body: {err}"));
        }
    };
    if request.cities.is_empty() {
        return error_reply("'cities' must be a non-empty list".to_string());
    }

    let Some(total_distance) =
        PathGeometry::finite_path_length(request.cities.iter().map(City::coords))
    else {
        return error_reply("route length overflows the finite range".to_string());
    };
    log::trace!(
        "service: scored cities={} total={total_distance}",
        request.cities.len()
    );
    reply::with_status(
        reply::json(&ScoreResponse { total_distance }),
        StatusCode::OK,
    )
    .into_response()
}

fn error_reply(error: String) -> Response {
    reply::with_status(
        reply::json(&ErrorResponse { error }),
        StatusCode::BAD_REQUEST,
    )
    .into_response()
}

/// Serves until `shutdown` trips.
pub async fn serve(port: u16, shutdown: &Cancellation) -> Result<()> {
    let shutdown = shutdown.clone();
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let (bound, server) = warp::serve(routes())
        .try_bind_with_graceful_shutdown(addr, async move { shutdown.cancelled().await })
        .map_err(|e| Error::other(format!("failed to bind scoring service on {addr}: {e}")))?;

    log::info!("service: listening addr={bound}");
    server.await;
    log::info!("service: stopped");
    Ok(())
}

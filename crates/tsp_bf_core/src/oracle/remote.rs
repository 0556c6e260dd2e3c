use std::time::Duration;

use reqwest::{Client, Response};

use super::{
    DistanceOracle, ScoreResult,
    wire::{City, ScoreRequest, ScoreResponse},
};
use crate::{
    Result, Route, ScoreError, WaypointSet,
    constants::{DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_RETRY_BACKOFF_MS},
};

/// Delegates scoring to an HTTP service speaking the `calculate_distance` contract.
///
/// Retries are off by default; a dropped route is already tolerated by the search.
#[derive(Clone, Debug)]
pub struct RemoteOracle {
    client: Client,
    url: String,
    retries: u32,
    backoff: Duration,
}

impl RemoteOracle {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS))
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            retries: 0,
            backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        })
    }

    pub fn with_retries(mut self, retries: u32, backoff: Duration) -> Self {
        self.retries = retries;
        self.backoff = backoff;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn request_body(
        waypoints: &WaypointSet,
        route: &Route,
    ) -> std::result::Result<ScoreRequest, ScoreError> {
        let cities = waypoints
            .resolve(route.stops())?
            .into_iter()
            .map(|waypoint| City {
                id: waypoint.id.clone(),
                x: waypoint.x,
                y: waypoint.y,
            })
            .collect();
        Ok(ScoreRequest { cities })
    }

    async fn request_once(&self, body: &ScoreRequest) -> ScoreResult {
        let response = self
            .client
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(|e| ScoreError::Transport(e.to_string()))?;
        let response = check_status(response).await?;
        let text = response
            .text()
            .await
            .map_err(|e| ScoreError::Transport(e.to_string()))?;
        parse_total_distance(&text)
    }
}

impl DistanceOracle for RemoteOracle {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn score(&self, waypoints: &WaypointSet, route: &Route) -> ScoreResult {
        if route.is_empty() {
            return Ok(0.0);
        }
        let body = Self::request_body(waypoints, route)?;

        let mut attempt = 0;
        loop {
            match self.request_once(&body).await {
                Err(err) if err.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    log::debug!(
                        "remote: retry attempt={attempt}/{} err={err}",
                        self.retries
                    );
                    tokio::time::sleep(self.backoff).await;
                }
                result => return result,
            }
        }
    }
}

async fn check_status(response: Response) -> std::result::Result<Response, ScoreError> {
    let status = response.status().as_u16();
    if !(200..=299).contains(&status) {
        let body = response.text().await.unwrap_or_default();
        return Err(ScoreError::Status { status, body });
    }
    Ok(response)
}

fn parse_total_distance(text: &str) -> ScoreResult {
    let parsed: ScoreResponse =
        serde_json::from_str(text).map_err(|e| ScoreError::malformed(e.to_string()))?;
    let distance = parsed.total_distance;
    if !distance.is_finite() || distance < 0.0 {
        return Err(ScoreError::malformed(format!(
            "total_distance must be a non-negative number, got {distance}"
        )));
    }
    Ok(distance)
}

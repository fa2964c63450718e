//! Route provider seam and the MapQuest directions client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::RouteConfig;
use crate::error::RouteError;

/// A resolved travel time between two addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveTime {
    pub duration_minutes: u32,
    /// Display form, e.g. "12 min".
    pub duration_text: String,
}

impl DriveTime {
    pub fn from_minutes(minutes: u32) -> Self {
        Self {
            duration_minutes: minutes,
            duration_text: format!("{} min", minutes),
        }
    }
}

/// A stop handed to the external multi-stop optimizer.
#[derive(Debug, Clone)]
pub struct RouteStop {
    pub id: Uuid,
    pub address: String,
    /// The stop's current position, if it has one.
    pub order: Option<i32>,
}

/// One leg between consecutive stops in the optimized sequence.
#[derive(Debug, Clone)]
pub struct RouteSegment {
    pub from_address: String,
    pub to_address: String,
    pub duration_minutes: Option<u32>,
    pub duration_text: Option<String>,
}

/// An optimized visiting order with per-leg durations.
#[derive(Debug, Clone)]
pub struct OptimizedRoute {
    /// Stop ids in visiting order.
    pub stop_ids: Vec<Uuid>,
    /// Legs in visiting order; `segments[0]` runs origin -> first stop.
    pub segments: Vec<RouteSegment>,
    pub total_minutes: u32,
}

/// Source of drive times and multi-stop optimization.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// Drive time between two addresses. `None` when the service cannot
    /// route the pair (the caller falls back to the offline heuristic).
    async fn drive_time(&self, from: &str, to: &str) -> Result<Option<DriveTime>, RouteError>;

    /// Optimize a multi-stop route starting from `origin`.
    async fn optimize_route(
        &self,
        origin: &str,
        stops: &[RouteStop],
    ) -> Result<OptimizedRoute, RouteError>;
}

/// MapQuest Directions API client.
pub struct MapQuestClient {
    client: Client,
    config: RouteConfig,
}

impl MapQuestClient {
    pub fn new(config: RouteConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, config }
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn api_key(&self) -> &str {
        self.config.api_key.as_deref().unwrap_or_default()
    }
}

#[async_trait]
impl RouteProvider for MapQuestClient {
    async fn drive_time(&self, from: &str, to: &str) -> Result<Option<DriveTime>, RouteError> {
        let url = self.api_url("directions/v2/route");

        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key()), ("from", from), ("to", to)])
            .send()
            .await
            .map_err(|e| RouteError::RequestFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RouteError::RequestFailed {
                reason: format!("HTTP {}", status),
            });
        }

        let parsed: DirectionsResponse =
            response
                .json()
                .await
                .map_err(|e| RouteError::InvalidResponse {
                    reason: e.to_string(),
                })?;

        Ok(parsed
            .route
            .and_then(|r| r.time)
            .map(|secs| DriveTime::from_minutes(seconds_to_minutes(secs))))
    }

    async fn optimize_route(
        &self,
        origin: &str,
        stops: &[RouteStop],
    ) -> Result<OptimizedRoute, RouteError> {
        let url = self.api_url("directions/v2/optimizedroute");

        let mut locations = Vec::with_capacity(stops.len() + 1);
        locations.push(origin.to_string());
        locations.extend(stops.iter().map(|s| s.address.clone()));

        tracing::debug!("Optimizing {} stops from {}", stops.len(), origin);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key())])
            .json(&OptimizedRouteRequest { locations: &locations })
            .send()
            .await
            .map_err(|e| RouteError::RequestFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RouteError::RequestFailed {
                reason: format!("HTTP {}", status),
            });
        }

        let parsed: OptimizedRouteResponse =
            response
                .json()
                .await
                .map_err(|e| RouteError::InvalidResponse {
                    reason: e.to_string(),
                })?;

        let route = parsed.route.ok_or(RouteError::EmptyRoute)?;
        build_optimized(origin, stops, route)
    }
}

/// Convert the wire sequence/legs into stop ids and segments.
///
/// The sequence indexes the submitted location list, origin at 0.
fn build_optimized(
    origin: &str,
    stops: &[RouteStop],
    route: WireRoute,
) -> Result<OptimizedRoute, RouteError> {
    let sequence = route.location_sequence.unwrap_or_default();

    let mut stop_ids = Vec::new();
    let mut addresses = vec![origin.to_string()];
    for idx in sequence {
        if idx == 0 {
            continue;
        }
        let stop = stops
            .get(idx - 1)
            .ok_or_else(|| RouteError::InvalidResponse {
                reason: format!("sequence index {} out of range", idx),
            })?;
        stop_ids.push(stop.id);
        addresses.push(stop.address.clone());
    }

    if stop_ids.len() != stops.len() {
        return Err(RouteError::EmptyRoute);
    }

    let legs = route.legs.unwrap_or_default();
    let segments = addresses
        .windows(2)
        .enumerate()
        .map(|(i, pair)| {
            let minutes = legs.get(i).and_then(|l| l.time).map(seconds_to_minutes);
            RouteSegment {
                from_address: pair[0].clone(),
                to_address: pair[1].clone(),
                duration_minutes: minutes,
                duration_text: minutes.map(|m| format!("{} min", m)),
            }
        })
        .collect();

    Ok(OptimizedRoute {
        stop_ids,
        segments,
        total_minutes: seconds_to_minutes(route.time.unwrap_or(0)),
    })
}

fn seconds_to_minutes(secs: u64) -> u32 {
    (secs.div_ceil(60)).min(u32::MAX as u64) as u32
}

#[derive(Debug, Serialize)]
struct OptimizedRouteRequest<'a> {
    locations: &'a [String],
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    route: Option<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    time: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OptimizedRouteResponse {
    route: Option<WireRoute>,
}

#[derive(Debug, Deserialize)]
struct WireRoute {
    #[serde(rename = "locationSequence")]
    location_sequence: Option<Vec<usize>>,
    legs: Option<Vec<WireLeg>>,
    time: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct WireLeg {
    time: Option<u64>,
}

//! Typed client for the TFL Unified API
//!
//! Fetches raw JSON from fixed endpoint templates, authenticating with an
//! `app_key` query parameter, and maps the responses into the flattened
//! shapes the tools return. The `TransitProvider` trait is the seam the
//! MCP layer and the tests depend on.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::errors::AppError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ==================== Output shapes ====================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LineStatus {
    pub id: Option<String>,
    pub name: Option<String>,
    pub mode: Option<String>,
    pub status: String,
    pub severity: i64,
    pub reason: Option<String>,
    pub disruption_category: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Arrival {
    pub line: Option<String>,
    pub destination: Option<String>,
    pub platform: Option<String>,
    pub direction: Option<String>,
    pub time_to_arrival_seconds: i64,
    pub time_to_arrival_minutes: f64,
    pub expected_arrival: Option<String>,
    pub vehicle_id: Option<String>,
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StopPoint {
    pub id: Option<String>,
    pub name: Option<String>,
    pub modes: Vec<String>,
    pub zone: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AffectedEntity {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Disruption {
    pub category: Option<String>,
    pub description: Option<String>,
    pub affected_routes: Vec<AffectedEntity>,
    pub affected_stops: Vec<AffectedEntity>,
    pub closure_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BusRoute {
    pub id: Option<String>,
    pub name: Option<String>,
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JourneyLeg {
    pub mode: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub duration_minutes: Option<i64>,
    pub line: Option<String>,
    pub direction: Option<String>,
    pub instruction: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Journey {
    pub duration_minutes: Option<i64>,
    pub departure_time: Option<String>,
    pub arrival_time: Option<String>,
    pub legs: Vec<JourneyLeg>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JourneyPlan {
    pub from: String,
    pub to: String,
    pub journeys: Vec<Journey>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlaceOption {
    pub name: Option<String>,
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub place_type: Option<String>,
}

/// A journey request either produces a plan or, on an upstream 300 that
/// cannot be auto-resolved, the candidate locations for each side.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum JourneyOutcome {
    Plan(JourneyPlan),
    Ambiguous {
        from_options: Vec<PlaceOption>,
        to_options: Vec<PlaceOption>,
    },
}

// ==================== Raw upstream shapes ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLine {
    pub id: Option<String>,
    pub name: Option<String>,
    pub mode_name: Option<String>,
    #[serde(default)]
    pub line_statuses: Vec<RawLineStatusEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLineStatusEntry {
    pub status_severity: Option<i64>,
    pub status_severity_description: Option<String>,
    pub reason: Option<String>,
    pub disruption: Option<RawDisruptionRef>,
}

#[derive(Debug, Deserialize)]
pub struct RawDisruptionRef {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPrediction {
    pub line_name: Option<String>,
    pub destination_name: Option<String>,
    pub platform_name: Option<String>,
    pub direction: Option<String>,
    #[serde(default)]
    pub time_to_station: i64,
    pub expected_arrival: Option<String>,
    pub vehicle_id: Option<String>,
    pub mode_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStopPoint {
    pub id: Option<String>,
    pub naptan_id: Option<String>,
    pub ics_id: Option<String>,
    pub name: Option<String>,
    pub common_name: Option<String>,
    #[serde(default)]
    pub modes: Vec<String>,
    pub zone: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(default)]
    pub lines: Vec<RawLineRef>,
}

#[derive(Debug, Deserialize)]
pub struct RawLineRef {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawSearchResponse {
    #[serde(default)]
    pub matches: Vec<RawStopPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStopPointsResponse {
    #[serde(default)]
    pub stop_points: Vec<RawStopPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDisruption {
    pub category: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub affected_routes: Vec<RawAffected>,
    #[serde(default)]
    pub affected_stops: Vec<RawAffected>,
    pub closure_text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawAffected {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawJourneyResponse {
    #[serde(default)]
    pub journeys: Vec<RawJourney>,
    pub from_location_disambiguation: Option<RawDisambiguation>,
    pub to_location_disambiguation: Option<RawDisambiguation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawJourney {
    pub duration: Option<i64>,
    pub start_date_time: Option<String>,
    pub arrival_date_time: Option<String>,
    #[serde(default)]
    pub legs: Vec<RawLeg>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLeg {
    pub mode: Option<RawLineRef>,
    pub departure_point: Option<RawPointRef>,
    pub arrival_point: Option<RawPointRef>,
    pub duration: Option<i64>,
    #[serde(default)]
    pub route_options: Vec<RawRouteOption>,
    pub instruction: Option<RawInstruction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPointRef {
    pub common_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawRouteOption {
    pub name: Option<String>,
    pub direction: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawInstruction {
    pub summary: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDisambiguation {
    pub matched_stop: Option<RawPointRef>,
    #[serde(default)]
    pub disambiguation_options: Vec<RawDisambiguationOption>,
}

#[derive(Debug, Deserialize)]
pub struct RawDisambiguationOption {
    pub place: Option<RawPlace>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlace {
    pub common_name: Option<String>,
    pub ics_code: Option<String>,
    pub naptan_id: Option<String>,
    pub id: Option<String>,
    pub place_type: Option<String>,
}

// ==================== Provider trait ====================

#[async_trait]
pub trait TransitProvider: Send + Sync {
    async fn line_status(&self, modes: &str) -> Result<Vec<LineStatus>, AppError>;
    async fn arrivals(&self, stop_id: &str) -> Result<Vec<Arrival>, AppError>;
    async fn search_stops(&self, query: &str, modes: &str) -> Result<Vec<StopPoint>, AppError>;
    async fn plan_journey(&self, from: &str, to: &str) -> Result<JourneyOutcome, AppError>;
    async fn line_stops(&self, line_id: &str) -> Result<Vec<StopPoint>, AppError>;
    async fn disruptions(&self, modes: &str) -> Result<Vec<Disruption>, AppError>;
    async fn bus_routes(&self) -> Result<Vec<BusRoute>, AppError>;
    async fn stops_near(
        &self,
        lat: f64,
        lon: f64,
        radius: u32,
    ) -> Result<Vec<StopPoint>, AppError>;
}

// ==================== HTTP client ====================

pub struct TflClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl TflClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, AppError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| AppError::internal(format!("failed to build http client: {err}")))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    /// Build a URL from path segments, percent-encoding each one. Queries
    /// like "King's Cross" go through a path segment, so this matters.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| AppError::internal(format!("invalid TFL base url: {err}")))?;
        url.path_segments_mut()
            .map_err(|_| AppError::internal("TFL base url cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: &[(&str, String)],
    ) -> Result<T, AppError> {
        let url = self.endpoint(segments)?;
        let response = self
            .http
            .get(url)
            .query(params)
            .query(&[("app_key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|err| AppError::upstream(format!("Connection error: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(upstream_status_error(status));
        }

        response
            .json::<T>()
            .await
            .map_err(|err| AppError::upstream(format!("Failed to parse TFL response: {err}")))
    }
}

fn upstream_status_error(status: StatusCode) -> AppError {
    let message = match status.as_u16() {
        400 => "Invalid request - please check your input".to_string(),
        403 => "Request blocked - invalid characters in input".to_string(),
        404 => "Not found - location or stop does not exist".to_string(),
        code => format!("TFL API error: HTTP {code}"),
    };
    AppError::upstream(message)
}

#[async_trait]
impl TransitProvider for TflClient {
    async fn line_status(&self, modes: &str) -> Result<Vec<LineStatus>, AppError> {
        let raw: Vec<RawLine> = self
            .get_json(&["Line", "Mode", modes, "Status"], &[])
            .await?;
        Ok(raw.into_iter().map(map_line_status).collect())
    }

    async fn arrivals(&self, stop_id: &str) -> Result<Vec<Arrival>, AppError> {
        let raw: Vec<RawPrediction> = self
            .get_json(&["StopPoint", stop_id, "Arrivals"], &[])
            .await
            .map_err(|err| match err {
                AppError::Upstream { .. } => AppError::upstream(format!(
                    "Could not find arrivals for stop '{stop_id}'. Please check the stop ID."
                )),
                other => other,
            })?;
        Ok(map_arrivals(raw))
    }

    async fn search_stops(&self, query: &str, modes: &str) -> Result<Vec<StopPoint>, AppError> {
        let raw: RawSearchResponse = self
            .get_json(
                &["StopPoint", "Search", query],
                &[("modes", modes.to_string())],
            )
            .await?;
        Ok(raw.matches.into_iter().map(map_stop).collect())
    }

    async fn plan_journey(&self, from: &str, to: &str) -> Result<JourneyOutcome, AppError> {
        let mut from = from.to_string();
        let mut to = to.to_string();

        // One retry after auto-resolving an upstream 300 (disambiguation).
        for attempt in 0..2 {
            let url =
                self.endpoint(&["Journey", "JourneyResults", from.as_str(), "to", to.as_str()])?;
            let response = self
                .http
                .get(url)
                .query(&[("app_key", self.api_key.as_str())])
                .send()
                .await
                .map_err(|err| AppError::upstream(format!("Connection error: {err}")))?;

            let status = response.status();
            if status == StatusCode::MULTIPLE_CHOICES {
                let raw: RawJourneyResponse = response.json().await.map_err(|err| {
                    AppError::upstream(format!("Failed to parse TFL response: {err}"))
                })?;

                let from_options = disambiguation_options(raw.from_location_disambiguation);
                let to_options = disambiguation_options(raw.to_location_disambiguation);
                let resolved_from = pick_place_id(&from_options);
                let resolved_to = pick_place_id(&to_options);

                if attempt == 0 && (resolved_from.is_some() || resolved_to.is_some()) {
                    if let Some(id) = resolved_from {
                        from = id;
                    }
                    if let Some(id) = resolved_to {
                        to = id;
                    }
                    continue;
                }

                return Ok(JourneyOutcome::Ambiguous {
                    from_options: from_options.into_iter().take(5).map(map_place).collect(),
                    to_options: to_options.into_iter().take(5).map(map_place).collect(),
                });
            }

            if !status.is_success() {
                return Err(upstream_status_error(status));
            }

            let raw: RawJourneyResponse = response
                .json()
                .await
                .map_err(|err| AppError::upstream(format!("Failed to parse TFL response: {err}")))?;

            if raw.journeys.is_empty() {
                return Err(AppError::upstream("No journeys found"));
            }

            return Ok(JourneyOutcome::Plan(map_journey_plan(raw, &from, &to)));
        }

        Err(AppError::upstream(
            "Ambiguous locations - please be more specific",
        ))
    }

    async fn line_stops(&self, line_id: &str) -> Result<Vec<StopPoint>, AppError> {
        let raw: Vec<RawStopPoint> = self
            .get_json(&["Line", line_id, "StopPoints"], &[])
            .await
            .map_err(|err| match err {
                AppError::Upstream { .. } => AppError::upstream(format!(
                    "Could not find line '{line_id}'. Try: victoria, central, northern, jubilee, dlr, elizabeth"
                )),
                other => other,
            })?;
        Ok(raw.into_iter().map(map_stop).collect())
    }

    async fn disruptions(&self, modes: &str) -> Result<Vec<Disruption>, AppError> {
        let raw: Vec<RawDisruption> = self
            .get_json(&["Line", "Mode", modes, "Disruption"], &[])
            .await?;
        Ok(raw.into_iter().map(map_disruption).collect())
    }

    async fn bus_routes(&self) -> Result<Vec<BusRoute>, AppError> {
        let raw: Vec<RawLine> = self.get_json(&["Line", "Mode", "bus"], &[]).await?;
        Ok(raw
            .into_iter()
            .map(|line| BusRoute {
                id: line.id,
                name: line.name,
                mode: line.mode_name,
            })
            .collect())
    }

    async fn stops_near(
        &self,
        lat: f64,
        lon: f64,
        radius: u32,
    ) -> Result<Vec<StopPoint>, AppError> {
        let raw: RawStopPointsResponse = self
            .get_json(
                &["StopPoint"],
                &[
                    ("stopTypes", "NaptanPublicBusCoachTram".to_string()),
                    ("lat", lat.to_string()),
                    ("lon", lon.to_string()),
                    ("radius", radius.to_string()),
                ],
            )
            .await?;
        Ok(raw.stop_points.into_iter().map(map_stop).collect())
    }
}

// ==================== Raw-to-output mapping ====================

pub fn map_line_status(line: RawLine) -> LineStatus {
    let current = line.line_statuses.into_iter().next();

    LineStatus {
        id: line.id,
        name: line.name,
        mode: line.mode_name,
        status: current
            .as_ref()
            .and_then(|entry| entry.status_severity_description.clone())
            .unwrap_or_else(|| "Unknown".to_string()),
        severity: current
            .as_ref()
            .and_then(|entry| entry.status_severity)
            .unwrap_or(0),
        reason: current.as_ref().and_then(|entry| entry.reason.clone()),
        disruption_category: current
            .and_then(|entry| entry.disruption)
            .and_then(|disruption| disruption.category),
    }
}

pub fn map_arrivals(raw: Vec<RawPrediction>) -> Vec<Arrival> {
    let mut arrivals: Vec<Arrival> = raw.into_iter().map(map_arrival).collect();
    arrivals.sort_by_key(|arrival| arrival.time_to_arrival_seconds);
    arrivals
}

fn map_arrival(prediction: RawPrediction) -> Arrival {
    let seconds = prediction.time_to_station;
    Arrival {
        line: prediction.line_name,
        destination: prediction.destination_name,
        platform: prediction.platform_name,
        direction: prediction.direction,
        time_to_arrival_seconds: seconds,
        time_to_arrival_minutes: (seconds as f64 / 60.0 * 10.0).round() / 10.0,
        expected_arrival: prediction.expected_arrival,
        vehicle_id: prediction.vehicle_id,
        mode: prediction.mode_name,
    }
}

pub fn map_stop(stop: RawStopPoint) -> StopPoint {
    StopPoint {
        id: stop.id.or(stop.naptan_id).or(stop.ics_id),
        name: stop.name.or(stop.common_name),
        modes: stop.modes,
        zone: stop.zone,
        lat: stop.lat,
        lon: stop.lon,
        lines: stop.lines.into_iter().filter_map(|line| line.name).collect(),
    }
}

pub fn map_disruption(disruption: RawDisruption) -> Disruption {
    Disruption {
        category: disruption.category,
        description: disruption.description,
        affected_routes: disruption
            .affected_routes
            .into_iter()
            .map(|route| AffectedEntity {
                id: route.id,
                name: route.name,
            })
            .collect(),
        affected_stops: disruption
            .affected_stops
            .into_iter()
            .map(|stop| AffectedEntity {
                id: stop.id,
                name: stop.name,
            })
            .collect(),
        closure_text: disruption.closure_text,
    }
}

pub fn map_journey_plan(raw: RawJourneyResponse, from: &str, to: &str) -> JourneyPlan {
    let matched_name = |disambiguation: Option<RawDisambiguation>| {
        disambiguation
            .and_then(|value| value.matched_stop)
            .and_then(|stop| stop.common_name)
    };

    JourneyPlan {
        from: matched_name(raw.from_location_disambiguation).unwrap_or_else(|| from.to_string()),
        to: matched_name(raw.to_location_disambiguation).unwrap_or_else(|| to.to_string()),
        journeys: raw.journeys.into_iter().take(3).map(map_journey).collect(),
    }
}

fn map_journey(journey: RawJourney) -> Journey {
    Journey {
        duration_minutes: journey.duration,
        departure_time: journey.start_date_time,
        arrival_time: journey.arrival_date_time,
        legs: journey.legs.into_iter().map(map_leg).collect(),
    }
}

fn map_leg(leg: RawLeg) -> JourneyLeg {
    let route = leg.route_options.into_iter().next();
    JourneyLeg {
        mode: leg.mode.and_then(|mode| mode.name),
        from: leg.departure_point.and_then(|point| point.common_name),
        to: leg.arrival_point.and_then(|point| point.common_name),
        duration_minutes: leg.duration,
        line: route.as_ref().and_then(|option| option.name.clone()),
        direction: route.and_then(|option| option.direction),
        instruction: leg.instruction.and_then(|value| value.summary),
    }
}

fn disambiguation_options(
    disambiguation: Option<RawDisambiguation>,
) -> Vec<RawDisambiguationOption> {
    disambiguation
        .map(|value| value.disambiguation_options)
        .unwrap_or_default()
}

/// Pick a location id from disambiguation options, preferring stations and
/// stops over other place types, falling back to the first option.
fn pick_place_id(options: &[RawDisambiguationOption]) -> Option<String> {
    let place_id = |place: &RawPlace| {
        place
            .ics_code
            .clone()
            .or_else(|| place.naptan_id.clone())
            .or_else(|| place.id.clone())
    };

    options
        .iter()
        .filter_map(|option| option.place.as_ref())
        .find(|place| {
            matches!(
                place.place_type.as_deref(),
                Some("StopPoint") | Some("Station")
            )
        })
        .and_then(place_id)
        .or_else(|| {
            options
                .first()
                .and_then(|option| option.place.as_ref())
                .and_then(place_id)
        })
}

fn map_place(option: RawDisambiguationOption) -> PlaceOption {
    let place = option.place;
    PlaceOption {
        name: place.as_ref().and_then(|value| value.common_name.clone()),
        id: place.as_ref().and_then(|value| {
            value
                .ics_code
                .clone()
                .or_else(|| value.naptan_id.clone())
        }),
        place_type: place.and_then(|value| value.place_type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_line_status_from_first_entry() {
        let raw: RawLine = serde_json::from_value(json!({
            "id": "victoria",
            "name": "Victoria",
            "modeName": "tube",
            "lineStatuses": [
                {
                    "statusSeverity": 5,
                    "statusSeverityDescription": "Part Closure",
                    "reason": "engineering works",
                    "disruption": { "category": "PlannedWork" }
                },
                { "statusSeverity": 10, "statusSeverityDescription": "Good Service" }
            ]
        }))
        .expect("raw line parses");

        let status = map_line_status(raw);
        assert_eq!(status.status, "Part Closure");
        assert_eq!(status.severity, 5);
        assert_eq!(status.reason.as_deref(), Some("engineering works"));
        assert_eq!(status.disruption_category.as_deref(), Some("PlannedWork"));
    }

    #[test]
    fn line_without_statuses_maps_to_unknown() {
        let raw: RawLine = serde_json::from_value(json!({
            "id": "dlr",
            "name": "DLR",
            "modeName": "dlr"
        }))
        .expect("raw line parses");

        let status = map_line_status(raw);
        assert_eq!(status.status, "Unknown");
        assert_eq!(status.severity, 0);
        assert!(status.reason.is_none());
    }

    #[test]
    fn arrivals_are_sorted_by_time_to_station() {
        let raw: Vec<RawPrediction> = serde_json::from_value(json!([
            { "lineName": "73", "timeToStation": 300, "modeName": "bus" },
            { "lineName": "N29", "timeToStation": 90, "modeName": "bus" }
        ]))
        .expect("raw predictions parse");

        let arrivals = map_arrivals(raw);
        assert_eq!(arrivals[0].line.as_deref(), Some("N29"));
        assert_eq!(arrivals[0].time_to_arrival_seconds, 90);
        assert_eq!(arrivals[0].time_to_arrival_minutes, 1.5);
        assert_eq!(arrivals[1].line.as_deref(), Some("73"));
    }

    #[test]
    fn stop_id_and_name_fall_back_through_aliases() {
        let raw: RawStopPoint = serde_json::from_value(json!({
            "naptanId": "940GZZLUKSX",
            "commonName": "King's Cross St. Pancras",
            "modes": ["tube"],
            "zone": "1",
            "lines": [{ "name": "Victoria" }, { "name": "Northern" }]
        }))
        .expect("raw stop parses");

        let stop = map_stop(raw);
        assert_eq!(stop.id.as_deref(), Some("940GZZLUKSX"));
        assert_eq!(stop.name.as_deref(), Some("King's Cross St. Pancras"));
        assert_eq!(stop.lines, vec!["Victoria", "Northern"]);
    }

    #[test]
    fn journey_plan_prefers_matched_stop_names_and_keeps_three_journeys() {
        let raw: RawJourneyResponse = serde_json::from_value(json!({
            "fromLocationDisambiguation": { "matchedStop": { "commonName": "Victoria Station" } },
            "toLocationDisambiguation": {},
            "journeys": [
                { "duration": 25, "legs": [ {
                    "mode": { "name": "tube" },
                    "departurePoint": { "commonName": "Victoria" },
                    "arrivalPoint": { "commonName": "Oxford Circus" },
                    "duration": 5,
                    "routeOptions": [ { "name": "Victoria", "direction": "Northbound" } ],
                    "instruction": { "summary": "Victoria line towards Walthamstow" }
                } ] },
                { "duration": 30, "legs": [] },
                { "duration": 35, "legs": [] },
                { "duration": 60, "legs": [] }
            ]
        }))
        .expect("raw journey parses");

        let plan = map_journey_plan(raw, "victoria", "oxford circus");
        assert_eq!(plan.from, "Victoria Station");
        assert_eq!(plan.to, "oxford circus");
        assert_eq!(plan.journeys.len(), 3);
        let leg = &plan.journeys[0].legs[0];
        assert_eq!(leg.line.as_deref(), Some("Victoria"));
        assert_eq!(leg.direction.as_deref(), Some("Northbound"));
        assert_eq!(
            leg.instruction.as_deref(),
            Some("Victoria line towards Walthamstow")
        );
    }

    #[test]
    fn pick_place_id_prefers_stations_over_earlier_addresses() {
        let options: Vec<RawDisambiguationOption> = serde_json::from_value(json!([
            { "place": { "commonName": "Victoria Road", "placeType": "Address", "id": "addr-1" } },
            { "place": { "commonName": "Victoria Station", "placeType": "StopPoint", "icsCode": "1000248" } }
        ]))
        .expect("options parse");

        assert_eq!(pick_place_id(&options).as_deref(), Some("1000248"));
    }

    #[test]
    fn pick_place_id_falls_back_to_first_option() {
        let options: Vec<RawDisambiguationOption> = serde_json::from_value(json!([
            { "place": { "commonName": "Somewhere", "placeType": "Address", "naptanId": "n-1" } }
        ]))
        .expect("options parse");

        assert_eq!(pick_place_id(&options).as_deref(), Some("n-1"));
    }

    #[test]
    fn upstream_status_errors_are_descriptive() {
        for (status, needle) in [
            (StatusCode::BAD_REQUEST, "Invalid request"),
            (StatusCode::FORBIDDEN, "Request blocked"),
            (StatusCode::NOT_FOUND, "Not found"),
            (StatusCode::INTERNAL_SERVER_ERROR, "HTTP 500"),
        ] {
            let error = upstream_status_error(status);
            assert!(error.to_string().contains(needle), "{status}: {error}");
        }
    }
}

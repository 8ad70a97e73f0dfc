//! Interactive tools exposed via Model Context Protocol
//!
//! Nine independent tools, each translating validated parameters into a
//! single TFL API request through the `TransitProvider` and reshaping the
//! response. Domain failures (bad input, upstream errors) come back as
//! in-band error results; only structurally malformed requests surface as
//! JSON-RPC errors.

use chrono::{SecondsFormat, Utc};
use rust_mcp_sdk::{
    macros,
    schema::{CallToolRequestParams, CallToolResult, ContentBlock, TextContent, Tool},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::domain::utils::{
    clamp_radius, filter_bus_arrivals, filter_bus_routes, normalize_arrivals_limit,
    normalize_modes, require_identifier, require_query, sanitize_query, within_uk_bounds,
    DEFAULT_SEARCH_MODES, DEFAULT_STATUS_MODES, MAX_BUS_ARRIVALS, MAX_BUS_ROUTES,
    MAX_SEARCH_RESULTS,
};
use crate::mcp::rpc::{json_rpc_error, json_rpc_error_with_data, json_rpc_result};
use crate::{
    errors::AppError,
    tfl_client::JourneyOutcome,
    AppState,
};

#[macros::mcp_tool(
    name = "get_arrivals",
    description = "Get real-time arrival predictions at a TFL station or stop. Returns next trains/buses with times and destinations."
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetArrivalsTool {
    /// NaPTAN ID of the stop (use search_stops to find this)
    pub stop_id: String,
    /// Maximum number of arrivals to return (default 10)
    pub limit: Option<u32>,
}

#[macros::mcp_tool(
    name = "get_line_status",
    description = "Get current status of TFL lines (Tube, DLR, Overground, Elizabeth line) with any disruption details."
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetLineStatusTool {
    /// Comma-separated transport modes, defaults to the main rail services
    pub modes: Option<String>,
}

#[macros::mcp_tool(
    name = "search_stops",
    description = "Search for TFL stations and stops by name. Returns IDs needed for other tools like get_arrivals."
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct SearchStopsTool {
    /// Station or stop name, e.g. "King's Cross"
    pub query: String,
    /// Comma-separated modes to filter, defaults to rail and bus
    pub modes: Option<String>,
}

#[macros::mcp_tool(
    name = "plan_journey",
    description = "Plan a journey between two locations using TFL. Returns route options with duration and step-by-step directions. Use specific station names like 'King's Cross Station' or 'Heathrow Terminal 5' for best results."
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct PlanJourneyTool {
    /// Starting point: station name, postcode, or "lat,lon" coordinates
    pub from_location: String,
    /// Destination, same format options as from_location
    pub to_location: String,
}

#[macros::mcp_tool(
    name = "get_line_stops",
    description = "Get all stops on a specific TFL line. Useful for finding stations served by a particular line."
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetLineStopsTool {
    /// Line identifier, e.g. victoria, central, dlr, elizabeth
    pub line_id: String,
}

#[macros::mcp_tool(
    name = "get_disruptions",
    description = "Get current service disruptions across the TFL network. Shows what's affected and closure details."
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetDisruptionsTool {
    /// Comma-separated transport modes to check
    pub modes: Option<String>,
}

#[macros::mcp_tool(
    name = "get_bus_routes",
    description = "Get all London bus routes, optionally filtered by route number or name."
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetBusRoutesTool {
    /// Optional filter: route number (e.g. "73", "N29") or partial name
    pub query: Option<String>,
}

#[macros::mcp_tool(
    name = "search_bus_stops",
    description = "Search for bus stops by name or find stops near a location using coordinates."
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct SearchBusStopsTool {
    /// Search by stop name, e.g. "Trafalgar Square"
    pub query: Option<String>,
    /// Latitude for location-based search (use with lon)
    pub lat: Option<f64>,
    /// Longitude for location-based search (use with lat)
    pub lon: Option<f64>,
    /// Search radius in meters when using lat/lon (default 500, max 2000)
    pub radius: Option<u32>,
}

#[macros::mcp_tool(
    name = "get_bus_arrivals",
    description = "Get real-time bus arrivals at a specific bus stop, optionally filtered by bus line."
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetBusArrivalsTool {
    /// Bus stop NaPTAN ID (use search_bus_stops to find this)
    pub stop_id: String,
    /// Optional bus line filter, e.g. "73", "N29"
    pub line: Option<String>,
}

pub fn build_tools_list() -> Vec<Tool> {
    vec![
        GetArrivalsTool::tool(),
        GetLineStatusTool::tool(),
        SearchStopsTool::tool(),
        PlanJourneyTool::tool(),
        GetLineStopsTool::tool(),
        GetDisruptionsTool::tool(),
        GetBusRoutesTool::tool(),
        SearchBusStopsTool::tool(),
        GetBusArrivalsTool::tool(),
    ]
}

pub async fn handle_tools_call(state: &AppState, id: Option<Value>, params: Option<Value>) -> Value {
    let Some(raw_params) = params else {
        return json_rpc_error(id, -32602, "Invalid params");
    };

    let tool_call: CallToolRequestParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, -32602, "Invalid params"),
    };

    let arguments = json!(tool_call.arguments.unwrap_or_default());

    match tool_call.name.as_str() {
        "get_arrivals" => match parse_args::<GetArrivalsTool>(&id, arguments) {
            Ok(args) => get_arrivals(state, id, args).await,
            Err(error) => error,
        },
        "get_line_status" => match parse_args::<GetLineStatusTool>(&id, arguments) {
            Ok(args) => get_line_status(state, id, args).await,
            Err(error) => error,
        },
        "search_stops" => match parse_args::<SearchStopsTool>(&id, arguments) {
            Ok(args) => search_stops(state, id, args).await,
            Err(error) => error,
        },
        "plan_journey" => match parse_args::<PlanJourneyTool>(&id, arguments) {
            Ok(args) => plan_journey(state, id, args).await,
            Err(error) => error,
        },
        "get_line_stops" => match parse_args::<GetLineStopsTool>(&id, arguments) {
            Ok(args) => get_line_stops(state, id, args).await,
            Err(error) => error,
        },
        "get_disruptions" => match parse_args::<GetDisruptionsTool>(&id, arguments) {
            Ok(args) => get_disruptions(state, id, args).await,
            Err(error) => error,
        },
        "get_bus_routes" => match parse_args::<GetBusRoutesTool>(&id, arguments) {
            Ok(args) => get_bus_routes(state, id, args).await,
            Err(error) => error,
        },
        "search_bus_stops" => match parse_args::<SearchBusStopsTool>(&id, arguments) {
            Ok(args) => search_bus_stops(state, id, args).await,
            Err(error) => error,
        },
        "get_bus_arrivals" => match parse_args::<GetBusArrivalsTool>(&id, arguments) {
            Ok(args) => get_bus_arrivals(state, id, args).await,
            Err(error) => error,
        },
        _ => json_rpc_error_with_data(
            id,
            -32601,
            "Method not found",
            Some(json!({
                "code": "tool_not_found",
                "message": "unknown tool name",
                "details": {
                    "name": tool_call.name,
                },
            })),
        ),
    }
}

fn parse_args<T: DeserializeOwned>(id: &Option<Value>, arguments: Value) -> Result<T, Value> {
    serde_json::from_value(arguments)
        .map_err(|_| json_rpc_error(id.clone(), -32602, "Invalid params"))
}

fn tool_success(id: Option<Value>, summary: String, structured: Map<String, Value>) -> Value {
    json_rpc_result(
        id,
        serde_json::to_value(CallToolResult {
            content: vec![ContentBlock::from(TextContent::new(summary, None, None))],
            is_error: None,
            meta: None,
            structured_content: Some(structured),
        })
        .expect("tool result serialization"),
    )
}

/// In-band failure: the tool call itself succeeds at the protocol level and
/// carries a descriptive error string, so callers never see an exception.
fn tool_failure(id: Option<Value>, message: String) -> Value {
    json_rpc_result(
        id,
        serde_json::to_value(CallToolResult {
            content: vec![ContentBlock::from(TextContent::new(
                message.clone(),
                None,
                None,
            ))],
            is_error: Some(true),
            meta: None,
            structured_content: Some(Map::from_iter([("error".to_string(), json!(message))])),
        })
        .expect("tool error result serialization"),
    )
}

fn error_text(err: &AppError) -> String {
    match err {
        AppError::BadRequest { message, .. } => message.clone(),
        AppError::Upstream { message } => message.clone(),
        AppError::Unauthorized { message, .. } => (*message).to_string(),
        AppError::Internal { .. } => "internal error".to_string(),
    }
}

fn generated_at() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

async fn get_arrivals(state: &AppState, id: Option<Value>, args: GetArrivalsTool) -> Value {
    let stop_id = match require_identifier(
        &args.stop_id,
        "invalid_stop_id",
        "Please provide a valid stop ID. Use search_stops to find stop IDs.",
    ) {
        Ok(value) => value,
        Err(err) => return tool_failure(id, error_text(&err)),
    };
    let limit = normalize_arrivals_limit(args.limit);

    match state.transit.arrivals(&stop_id).await {
        Ok(arrivals) => {
            let total = arrivals.len();
            let arrivals = arrivals.into_iter().take(limit).collect::<Vec<_>>();
            let returned = arrivals.len();

            tool_success(
                id,
                format!("Returned {returned} of {total} arrivals at {stop_id}"),
                Map::from_iter([
                    ("arrivals".to_string(), json!(arrivals)),
                    ("total".to_string(), json!(total)),
                    ("returned".to_string(), json!(returned)),
                    ("truncated".to_string(), json!(total > returned)),
                    ("generated_at_utc".to_string(), json!(generated_at())),
                ]),
            )
        }
        Err(err) => tool_failure(id, error_text(&err)),
    }
}

async fn get_line_status(state: &AppState, id: Option<Value>, args: GetLineStatusTool) -> Value {
    let modes = match normalize_modes(args.modes, DEFAULT_STATUS_MODES) {
        Ok(value) => value,
        Err(err) => return tool_failure(id, error_text(&err)),
    };

    match state.transit.line_status(&modes).await {
        Ok(lines) => {
            let disrupted = lines
                .iter()
                .filter(|line| line.status != "Good Service")
                .count();

            tool_success(
                id,
                format!("{} lines, {disrupted} with reported issues", lines.len()),
                Map::from_iter([
                    ("lines".to_string(), json!(lines)),
                    ("modes".to_string(), json!(modes)),
                    ("generated_at_utc".to_string(), json!(generated_at())),
                ]),
            )
        }
        Err(err) => tool_failure(id, error_text(&err)),
    }
}

async fn search_stops(state: &AppState, id: Option<Value>, args: SearchStopsTool) -> Value {
    let query = match require_query(
        &args.query,
        "invalid_query",
        "Please provide a search query (station or stop name)",
    ) {
        Ok(value) => value,
        Err(err) => return tool_failure(id, error_text(&err)),
    };
    let modes = match normalize_modes(args.modes, DEFAULT_SEARCH_MODES) {
        Ok(value) => value,
        Err(err) => return tool_failure(id, error_text(&err)),
    };

    match state.transit.search_stops(&query, &modes).await {
        Ok(stops) => {
            let stops = stops
                .into_iter()
                .take(MAX_SEARCH_RESULTS)
                .collect::<Vec<_>>();

            tool_success(
                id,
                format!("Found {} stops matching '{query}'", stops.len()),
                Map::from_iter([
                    ("stops".to_string(), json!(stops)),
                    ("query".to_string(), json!(query)),
                ]),
            )
        }
        Err(err) => tool_failure(id, error_text(&err)),
    }
}

async fn plan_journey(state: &AppState, id: Option<Value>, args: PlanJourneyTool) -> Value {
    let from = match require_query(
        &args.from_location,
        "invalid_from_location",
        "Please provide a starting location",
    ) {
        Ok(value) => value,
        Err(err) => return tool_failure(id, error_text(&err)),
    };
    let to = match require_query(
        &args.to_location,
        "invalid_to_location",
        "Please provide a destination",
    ) {
        Ok(value) => value,
        Err(err) => return tool_failure(id, error_text(&err)),
    };

    if from.eq_ignore_ascii_case(&to) {
        return tool_failure(
            id,
            "Origin and destination are the same location".to_string(),
        );
    }

    match state.transit.plan_journey(&from, &to).await {
        Ok(JourneyOutcome::Plan(plan)) => tool_success(
            id,
            format!(
                "Found {} journey options from {} to {}",
                plan.journeys.len(),
                plan.from,
                plan.to
            ),
            Map::from_iter([
                ("from".to_string(), json!(plan.from)),
                ("to".to_string(), json!(plan.to)),
                ("journeys".to_string(), json!(plan.journeys)),
            ]),
        ),
        Ok(JourneyOutcome::Ambiguous {
            from_options,
            to_options,
        }) => {
            let message = "Ambiguous locations - please be more specific".to_string();
            json_rpc_result(
                id,
                serde_json::to_value(CallToolResult {
                    content: vec![ContentBlock::from(TextContent::new(
                        message.clone(),
                        None,
                        None,
                    ))],
                    is_error: Some(true),
                    meta: None,
                    structured_content: Some(Map::from_iter([
                        ("error".to_string(), json!(message)),
                        ("from_options".to_string(), json!(from_options)),
                        ("to_options".to_string(), json!(to_options)),
                    ])),
                })
                .expect("ambiguous journey result serialization"),
            )
        }
        Err(err) => tool_failure(id, error_text(&err)),
    }
}

async fn get_line_stops(state: &AppState, id: Option<Value>, args: GetLineStopsTool) -> Value {
    let line_id = match require_identifier(
        &args.line_id,
        "invalid_line_id",
        "Please provide a line ID (e.g., victoria, central, dlr, elizabeth)",
    ) {
        Ok(value) => value,
        Err(err) => return tool_failure(id, error_text(&err)),
    };

    match state.transit.line_stops(&line_id).await {
        Ok(stops) => tool_success(
            id,
            format!("Line {line_id} serves {} stops", stops.len()),
            Map::from_iter([
                ("stops".to_string(), json!(stops)),
                ("line_id".to_string(), json!(line_id)),
            ]),
        ),
        Err(err) => tool_failure(id, error_text(&err)),
    }
}

async fn get_disruptions(state: &AppState, id: Option<Value>, args: GetDisruptionsTool) -> Value {
    let modes = match normalize_modes(args.modes, DEFAULT_STATUS_MODES) {
        Ok(value) => value,
        Err(err) => return tool_failure(id, error_text(&err)),
    };

    match state.transit.disruptions(&modes).await {
        Ok(disruptions) => tool_success(
            id,
            format!("{} active disruptions", disruptions.len()),
            Map::from_iter([
                ("disruptions".to_string(), json!(disruptions)),
                ("modes".to_string(), json!(modes)),
                ("generated_at_utc".to_string(), json!(generated_at())),
            ]),
        ),
        Err(err) => tool_failure(id, error_text(&err)),
    }
}

async fn get_bus_routes(state: &AppState, id: Option<Value>, args: GetBusRoutesTool) -> Value {
    let query = args.query.as_deref().and_then(sanitize_query);

    match state.transit.bus_routes().await {
        Ok(routes) => {
            let routes = filter_bus_routes(routes, query.as_deref());
            let total = routes.len();
            let routes = routes.into_iter().take(MAX_BUS_ROUTES).collect::<Vec<_>>();
            let returned = routes.len();

            tool_success(
                id,
                format!("Returned {returned} of {total} bus routes"),
                Map::from_iter([
                    ("routes".to_string(), json!(routes)),
                    ("total".to_string(), json!(total)),
                    ("returned".to_string(), json!(returned)),
                    ("truncated".to_string(), json!(total > returned)),
                ]),
            )
        }
        Err(err) => tool_failure(id, error_text(&err)),
    }
}

async fn search_bus_stops(state: &AppState, id: Option<Value>, args: SearchBusStopsTool) -> Value {
    if let Some(query) = args.query.as_deref().and_then(sanitize_query) {
        return match state.transit.search_stops(&query, "bus").await {
            Ok(stops) => {
                let stops = stops
                    .into_iter()
                    .take(MAX_SEARCH_RESULTS)
                    .collect::<Vec<_>>();
                tool_success(
                    id,
                    format!("Found {} bus stops matching '{query}'", stops.len()),
                    Map::from_iter([
                        ("stops".to_string(), json!(stops)),
                        ("query".to_string(), json!(query)),
                    ]),
                )
            }
            Err(err) => tool_failure(id, error_text(&err)),
        };
    }

    if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
        if !within_uk_bounds(lat, lon) {
            return tool_failure(
                id,
                "Coordinates must be within the UK. Please check latitude and longitude."
                    .to_string(),
            );
        }
        let radius = clamp_radius(args.radius);

        return match state.transit.stops_near(lat, lon, radius).await {
            Ok(stops) => {
                let stops = stops
                    .into_iter()
                    .take(MAX_SEARCH_RESULTS)
                    .collect::<Vec<_>>();
                tool_success(
                    id,
                    format!("Found {} bus stops within {radius}m", stops.len()),
                    Map::from_iter([
                        ("stops".to_string(), json!(stops)),
                        ("radius_meters".to_string(), json!(radius)),
                    ]),
                )
            }
            Err(err) => tool_failure(id, error_text(&err)),
        };
    }

    tool_failure(
        id,
        "Please provide either a search query or coordinates (lat/lon)".to_string(),
    )
}

async fn get_bus_arrivals(state: &AppState, id: Option<Value>, args: GetBusArrivalsTool) -> Value {
    let stop_id = match require_identifier(
        &args.stop_id,
        "invalid_stop_id",
        "Please provide a bus stop ID. Use search_bus_stops to find stop IDs.",
    ) {
        Ok(value) => value,
        Err(err) => return tool_failure(id, error_text(&err)),
    };
    let line = args.line.as_deref().and_then(sanitize_query);

    match state.transit.arrivals(&stop_id).await {
        Ok(arrivals) => {
            let buses = filter_bus_arrivals(arrivals, line.as_deref());
            let total = buses.len();
            let buses = buses.into_iter().take(MAX_BUS_ARRIVALS).collect::<Vec<_>>();
            let returned = buses.len();

            tool_success(
                id,
                format!("Returned {returned} of {total} bus arrivals at {stop_id}"),
                Map::from_iter([
                    ("arrivals".to_string(), json!(buses)),
                    ("total".to_string(), json!(total)),
                    ("returned".to_string(), json!(returned)),
                    ("truncated".to_string(), json!(total > returned)),
                    ("generated_at_utc".to_string(), json!(generated_at())),
                ]),
            )
        }
        Err(err) => tool_failure(id, error_text(&err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tools_list_exposes_all_nine_tools() {
        let tools = build_tools_list();
        let names: Vec<&str> = tools.iter().map(|tool| tool.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "get_arrivals",
                "get_line_status",
                "search_stops",
                "plan_journey",
                "get_line_stops",
                "get_disruptions",
                "get_bus_routes",
                "search_bus_stops",
                "get_bus_arrivals",
            ]
        );
    }

    #[test]
    fn tool_failure_is_in_band_and_never_a_protocol_error() {
        let response = tool_failure(Some(json!(7)), "something went wrong".to_string());
        assert!(response.get("error").is_none());
        assert_eq!(response["result"]["isError"], json!(true));
        assert_eq!(
            response["result"]["structuredContent"]["error"],
            json!("something went wrong")
        );
        assert_eq!(
            response["result"]["content"][0]["text"],
            json!("something went wrong")
        );
    }

    #[test]
    fn error_text_hides_internal_details() {
        let err = AppError::internal("db password leaked");
        assert_eq!(error_text(&err), "internal error");

        let err = AppError::upstream("Connection error: timed out");
        assert_eq!(error_text(&err), "Connection error: timed out");
    }
}

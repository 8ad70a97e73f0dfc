//! Domain-specific shared validations and formatting utilities

use crate::{
    errors::AppError,
    tfl_client::{Arrival, BusRoute},
};

pub const DEFAULT_STATUS_MODES: &str = "tube,dlr,overground,elizabeth-line";
pub const DEFAULT_SEARCH_MODES: &str = "tube,dlr,overground,elizabeth-line,bus";

pub const DEFAULT_ARRIVALS_LIMIT: usize = 10;
pub const MAX_SEARCH_RESULTS: usize = 20;
pub const MAX_BUS_ROUTES: usize = 50;
pub const MAX_BUS_ARRIVALS: usize = 15;

pub const DEFAULT_SEARCH_RADIUS_METERS: u32 = 500;
pub const MIN_SEARCH_RADIUS_METERS: u32 = 50;
pub const MAX_SEARCH_RADIUS_METERS: u32 = 2_000;

const MAX_QUERY_CHARS: usize = 100;

/// Strip control characters the TFL gateway rejects and cap the length.
/// Returns None when nothing usable remains.
pub fn sanitize_query(value: &str) -> Option<String> {
    let cleaned = value
        .chars()
        .filter(|character| *character != '\0')
        .map(|character| {
            if character == '\n' || character == '\r' {
                ' '
            } else {
                character
            }
        })
        .collect::<String>();

    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return None;
    }

    Some(trimmed.chars().take(MAX_QUERY_CHARS).collect())
}

pub fn require_query(
    value: &str,
    code: &'static str,
    message: &'static str,
) -> Result<String, AppError> {
    sanitize_query(value).ok_or_else(|| AppError::bad_request(code, message))
}

/// Stop and line identifiers go into URL path segments, so only a narrow
/// character set is accepted.
pub fn require_identifier(
    value: &str,
    code: &'static str,
    message: &'static str,
) -> Result<String, AppError> {
    let normalized = value.trim();
    if normalized.is_empty() {
        return Err(AppError::bad_request(code, message));
    }

    if !normalized.chars().all(|character| {
        character.is_ascii_alphanumeric()
            || character == '-'
            || character == '_'
            || character == '.'
    }) {
        return Err(AppError::bad_request(code, message));
    }

    Ok(normalized.to_string())
}

pub fn normalize_modes(modes: Option<String>, default: &str) -> Result<String, AppError> {
    let value = match modes {
        Some(value) => value,
        None => return Ok(default.to_string()),
    };

    let normalized = value.trim().to_ascii_lowercase();
    if normalized.is_empty()
        || !normalized.chars().all(|character| {
            character.is_ascii_alphanumeric() || character == '-' || character == ','
        })
    {
        return Err(AppError::bad_request(
            "invalid_modes",
            "Please specify at least one transport mode (e.g., tube, dlr, overground)",
        ));
    }

    Ok(normalized)
}

/// Zero and absent both mean the default, matching the upstream contract.
pub fn normalize_arrivals_limit(limit: Option<u32>) -> usize {
    match limit {
        None | Some(0) => DEFAULT_ARRIVALS_LIMIT,
        Some(value) => value as usize,
    }
}

pub fn clamp_radius(radius: Option<u32>) -> u32 {
    radius
        .unwrap_or(DEFAULT_SEARCH_RADIUS_METERS)
        .clamp(MIN_SEARCH_RADIUS_METERS, MAX_SEARCH_RADIUS_METERS)
}

/// Rough UK bounding box; keeps location searches from scanning the planet.
pub fn within_uk_bounds(lat: f64, lon: f64) -> bool {
    lat > 49.0 && lat < 61.0 && lon > -11.0 && lon < 3.0
}

pub fn filter_bus_routes(routes: Vec<BusRoute>, query: Option<&str>) -> Vec<BusRoute> {
    let Some(query) = query else {
        return routes;
    };

    let needle = query.to_lowercase();
    routes
        .into_iter()
        .filter(|route| {
            route
                .id
                .as_deref()
                .is_some_and(|id| id.to_lowercase().contains(&needle))
                || route
                    .name
                    .as_deref()
                    .is_some_and(|name| name.to_lowercase().contains(&needle))
        })
        .collect()
}

pub fn filter_bus_arrivals(arrivals: Vec<Arrival>, line: Option<&str>) -> Vec<Arrival> {
    let needle = line.map(str::to_lowercase);
    arrivals
        .into_iter()
        .filter(|arrival| arrival.mode.as_deref() == Some("bus"))
        .filter(|arrival| match needle.as_deref() {
            Some(needle) => arrival
                .line
                .as_deref()
                .is_some_and(|line| line.to_lowercase().contains(needle)),
            None => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus_arrival(line: &str, mode: &str) -> Arrival {
        Arrival {
            line: Some(line.to_string()),
            destination: None,
            platform: None,
            direction: None,
            time_to_arrival_seconds: 60,
            time_to_arrival_minutes: 1.0,
            expected_arrival: None,
            vehicle_id: None,
            mode: Some(mode.to_string()),
        }
    }

    #[test]
    fn sanitize_query_strips_control_characters() {
        let query = sanitize_query("  King's\nCross\0  ").expect("usable query");
        assert_eq!(query, "King's Cross");
    }

    #[test]
    fn sanitize_query_caps_length() {
        let long = "x".repeat(500);
        let query = sanitize_query(&long).expect("usable query");
        assert_eq!(query.chars().count(), 100);
    }

    #[test]
    fn sanitize_query_rejects_blank_input() {
        assert!(sanitize_query("  \n\r ").is_none());
    }

    #[test]
    fn identifier_rejects_path_characters() {
        let error = require_identifier("940G/evil", "invalid_stop_id", "bad stop")
            .expect_err("expected invalid identifier");
        assert!(error.to_string().contains("bad request"));
    }

    #[test]
    fn identifier_accepts_naptan_ids() {
        let id = require_identifier(" 940GZZLUKSX ", "invalid_stop_id", "bad stop")
            .expect("valid identifier");
        assert_eq!(id, "940GZZLUKSX");
    }

    #[test]
    fn modes_default_when_absent() {
        let modes = normalize_modes(None, DEFAULT_STATUS_MODES).expect("default modes");
        assert_eq!(modes, DEFAULT_STATUS_MODES);
    }

    #[test]
    fn modes_rejects_blank_and_unsafe_values() {
        assert!(normalize_modes(Some("  ".to_string()), DEFAULT_STATUS_MODES).is_err());
        assert!(normalize_modes(Some("tube/../x".to_string()), DEFAULT_STATUS_MODES).is_err());
    }

    #[test]
    fn modes_are_lowercased() {
        let modes = normalize_modes(Some(" Tube,DLR ".to_string()), DEFAULT_STATUS_MODES)
            .expect("valid modes");
        assert_eq!(modes, "tube,dlr");
    }

    #[test]
    fn zero_limit_means_default() {
        assert_eq!(normalize_arrivals_limit(Some(0)), DEFAULT_ARRIVALS_LIMIT);
        assert_eq!(normalize_arrivals_limit(None), DEFAULT_ARRIVALS_LIMIT);
        assert_eq!(normalize_arrivals_limit(Some(3)), 3);
    }

    #[test]
    fn radius_is_clamped() {
        assert_eq!(clamp_radius(None), DEFAULT_SEARCH_RADIUS_METERS);
        assert_eq!(clamp_radius(Some(10)), MIN_SEARCH_RADIUS_METERS);
        assert_eq!(clamp_radius(Some(9_999)), MAX_SEARCH_RADIUS_METERS);
    }

    #[test]
    fn uk_bounds_check() {
        assert!(within_uk_bounds(51.5074, -0.1278));
        assert!(!within_uk_bounds(40.7128, -74.0060));
    }

    #[test]
    fn bus_route_filter_matches_id_or_name() {
        let routes = vec![
            BusRoute {
                id: Some("73".to_string()),
                name: Some("73".to_string()),
                mode: Some("bus".to_string()),
            },
            BusRoute {
                id: Some("n29".to_string()),
                name: Some("N29".to_string()),
                mode: Some("bus".to_string()),
            },
        ];

        let filtered = filter_bus_routes(routes, Some("N2"));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name.as_deref(), Some("N29"));
    }

    #[test]
    fn bus_arrival_filter_drops_other_modes_and_matches_line() {
        let arrivals = vec![
            bus_arrival("73", "bus"),
            bus_arrival("Victoria", "tube"),
            bus_arrival("N73", "bus"),
        ];

        let buses = filter_bus_arrivals(arrivals.clone(), None);
        assert_eq!(buses.len(), 2);

        let filtered = filter_bus_arrivals(arrivals, Some("n73"));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].line.as_deref(), Some("N73"));
    }
}

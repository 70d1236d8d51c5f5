//! HTTP handler functions for the disaster feed API.

use actix_web::{HttpResponse, web};
use disaster_feed_aggregator::Snapshot;
use disaster_feed_disaster_models::DisasterCategory;
use disaster_feed_geocoder::coordinate_label;
use disaster_feed_server_models::{
    ApiCategory, ApiDisaster, ApiHealth, ApiSnapshot, ApiSourceReport, DisasterQueryParams,
    GeoJsonQueryParams, GeocodeSearchParams, PointQueryParams, disasters_geojson,
};
use disaster_feed_source_models::{Coordinates, DisasterRecord};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/categories`
pub async fn categories() -> HttpResponse {
    let categories: Vec<ApiCategory> = DisasterCategory::all()
        .iter()
        .copied()
        .map(ApiCategory::from)
        .collect();
    HttpResponse::Ok().json(categories)
}

/// `GET /api/sources`
///
/// Lists all configured data sources.
pub async fn sources(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(&state.sources)
}

/// `GET /api/disasters`
///
/// Returns the visible disasters of the current snapshot, newest first.
pub async fn disasters(
    state: web::Data<AppState>,
    params: web::Query<DisasterQueryParams>,
) -> HttpResponse {
    if params.visible_only == Some(false) {
        return bad_request("Hidden disasters are never served; visibleOnly must be true");
    }
    let category = match parse_category(params.category.as_deref()) {
        Ok(category) => category,
        Err(response) => return response,
    };
    let min_severity = params.min_severity.unwrap_or(1);
    if !(1..=10).contains(&min_severity) {
        return bad_request("minSeverity must be between 1 and 10");
    }

    let snapshot = state.scheduler.current();
    let mut records: Vec<&DisasterRecord> = matching(&snapshot, category)
        .filter(|r| r.severity.value() >= min_severity)
        .collect();
    records.sort_by(|a, b| {
        b.occurred_at
            .cmp(&a.occurred_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    let disasters: Vec<ApiDisaster> = records.into_iter().map(ApiDisaster::from).collect();
    HttpResponse::Ok().json(disasters)
}

/// `GET /api/disasters.geojson`
///
/// Returns the map marker layer as a `GeoJSON` `FeatureCollection`.
pub async fn disasters_geojson_layer(
    state: web::Data<AppState>,
    params: web::Query<GeoJsonQueryParams>,
) -> HttpResponse {
    let category = match parse_category(params.category.as_deref()) {
        Ok(category) => category,
        Err(response) => return response,
    };

    let snapshot = state.scheduler.current();
    HttpResponse::Ok()
        .content_type("application/geo+json")
        .json(disasters_geojson(matching(&snapshot, category)))
}

/// `GET /api/risk`
///
/// Assesses hazard risk at a point.
pub async fn risk(
    state: web::Data<AppState>,
    params: web::Query<PointQueryParams>,
) -> HttpResponse {
    let (Some(lat), Some(lng)) = (params.lat, params.lng) else {
        return bad_request("lat and lng are required");
    };

    match state.risk.assess(lat, lng) {
        Ok(assessment) => HttpResponse::Ok().json(assessment),
        Err(e) => bad_request(&e.to_string()),
    }
}

/// `GET /api/snapshot`
pub async fn snapshot(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(snapshot_info(&state.scheduler.current()))
}

/// `POST /api/refresh`
///
/// Refreshes now, or waits for the refresh already in flight.
pub async fn refresh(state: web::Data<AppState>) -> HttpResponse {
    let snapshot = state.scheduler.refresh_now().await;
    HttpResponse::Ok().json(snapshot_info(&snapshot))
}

/// `GET /api/geocode/reverse`
///
/// Returns the address at a point, or a coordinate label when the lookup
/// fails.
pub async fn geocode_reverse(
    state: web::Data<AppState>,
    params: web::Query<PointQueryParams>,
) -> HttpResponse {
    let Some(coordinates) = params
        .lat
        .zip(params.lng)
        .and_then(|(lat, lng)| Coordinates::checked(lat, lng))
    else {
        return bad_request("lat and lng must be valid coordinates");
    };

    let address = match state.geocoder.reverse(coordinates).await {
        Ok(address) => address,
        Err(e) => {
            log::warn!(
                "Reverse geocoding failed for {}: {e}",
                coordinate_label(coordinates)
            );
            None
        }
    };

    HttpResponse::Ok().json(serde_json::json!({
        "latitude": coordinates.latitude,
        "longitude": coordinates.longitude,
        "label": address
            .as_ref()
            .map_or_else(|| coordinate_label(coordinates), |a| a.display_address.clone()),
        "resolved": address.is_some(),
        "components": address.map(|a| a.components),
    }))
}

/// `GET /api/geocode/search`
///
/// Returns place candidates, or an empty list when the lookup fails.
pub async fn geocode_search(
    state: web::Data<AppState>,
    params: web::Query<GeocodeSearchParams>,
) -> HttpResponse {
    let query = params.q.trim();
    if query.is_empty() {
        return bad_request("q must not be empty");
    }

    match state.geocoder.search(query).await {
        Ok(candidates) => HttpResponse::Ok().json(candidates),
        Err(e) => {
            log::warn!("Geocode search failed for '{query}': {e}");
            HttpResponse::Ok().json(Vec::<serde_json::Value>::new())
        }
    }
}

/// Builds the snapshot metadata response.
fn snapshot_info(snapshot: &Snapshot) -> ApiSnapshot {
    ApiSnapshot {
        cycle: snapshot.cycle,
        refreshed_at: snapshot.refreshed_at,
        stale: snapshot.stale,
        record_count: snapshot.records.len(),
        sources: snapshot
            .sources
            .iter()
            .map(|s| ApiSourceReport {
                source_id: s.source_id.clone(),
                category: s.category,
                fetched: s.fetched,
                kept: s.kept,
                hidden: s.hidden,
                missing_coordinates: s.missing_coordinates,
                error: s.error.clone(),
                elapsed_ms: s.elapsed_ms,
            })
            .collect(),
    }
}

fn matching(
    snapshot: &Snapshot,
    category: Option<DisasterCategory>,
) -> impl Iterator<Item = &DisasterRecord> {
    snapshot
        .records
        .iter()
        .filter(move |r| category.is_none_or(|c| r.category == c))
}

fn parse_category(value: Option<&str>) -> Result<Option<DisasterCategory>, HttpResponse> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(name) => name
            .parse()
            .map(Some)
            .map_err(|_| bad_request(&format!("Unknown category '{name}'"))),
    }
}

fn bad_request(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({ "error": message }))
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the disaster feed.
//!
//! Serves the aggregated disaster snapshot (as JSON cards and as a
//! `GeoJSON` marker layer), per-point hazard assessments and geocoding
//! lookups. A background scheduler keeps the snapshot fresh.

pub mod config;
mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use disaster_feed_aggregator::{Aggregator, RefreshScheduler};
use disaster_feed_geocoder::Geocoder;
use disaster_feed_geocoder::nominatim::NominatimGeocoder;
use disaster_feed_risk::RiskEngine;
use disaster_feed_source::FetchOptions;
use disaster_feed_source::registry;
use disaster_feed_source::retry::RetryPolicy;
use disaster_feed_source::source_def::SourceDefinition;
use disaster_feed_source_models::SourceConfig;

use crate::config::ServerConfig;

/// Shared application state.
pub struct AppState {
    /// Owns the published snapshot and runs refreshes.
    pub scheduler: RefreshScheduler,
    /// Configured sources, for listing.
    pub sources: Vec<SourceConfig>,
    /// Hazard assessment engine.
    pub risk: RiskEngine,
    /// Geocoding provider.
    pub geocoder: Arc<dyn Geocoder>,
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/categories", web::get().to(handlers::categories))
            .route("/sources", web::get().to(handlers::sources))
            .route("/disasters", web::get().to(handlers::disasters))
            .route(
                "/disasters.geojson",
                web::get().to(handlers::disasters_geojson_layer),
            )
            .route("/risk", web::get().to(handlers::risk))
            .route("/snapshot", web::get().to(handlers::snapshot))
            .route("/refresh", web::post().to(handlers::refresh))
            .route("/geocode/reverse", web::get().to(handlers::geocode_reverse))
            .route("/geocode/search", web::get().to(handlers::geocode_search)),
    );
}

/// Loads source definitions from `config.sources_dir`, or the embedded
/// set when unset.
///
/// # Errors
///
/// Returns an error if the directory cannot be read or a file is invalid.
pub fn load_sources(
    config: &ServerConfig,
) -> Result<Vec<SourceDefinition>, disaster_feed_source::SourceError> {
    config
        .sources_dir
        .as_deref()
        .map_or_else(|| Ok(registry::all_sources()), registry::load_sources_dir)
}

/// Starts the disaster feed API server.
///
/// Reads [`ServerConfig`] from the environment, loads the source
/// definitions, starts the refresh scheduler and serves until the HTTP
/// server stops, then stops the scheduler. This is a regular async
/// function; the caller provides the runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the sources cannot be
/// loaded, the geocoder client cannot be built, or the HTTP server fails to
/// bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = ServerConfig::from_env()?;

    log::info!("Loading source definitions...");
    let definitions = load_sources(&config)?;
    let sources: Vec<SourceConfig> = definitions.iter().map(SourceDefinition::config).collect();
    log::info!("Configured {} sources", sources.len());

    let aggregator = Aggregator::from_definitions(definitions)
        .with_timeout(config.source_timeout)
        .with_options(FetchOptions {
            retry: RetryPolicy::with_retries(config.source_retries),
            ..FetchOptions::default()
        });
    let scheduler = RefreshScheduler::new(Arc::new(aggregator));
    let handle = scheduler.start(config.refresh_interval);

    let risk = if config.risk_random {
        log::warn!("Risk scoring is non-deterministic (RISK_RANDOM is set)");
        RiskEngine::random()
    } else {
        RiskEngine::seeded(config.risk_seed)
    };

    let mut geocoder = NominatimGeocoder::new(&config.nominatim_url)?;
    if let Some(codes) = &config.nominatim_country_codes {
        geocoder = geocoder.with_country_codes(codes);
    }

    let state = web::Data::new(AppState {
        scheduler,
        sources,
        risk,
        geocoder: Arc::new(geocoder),
    });

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    let result = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await;

    log::info!("Stopping refresh scheduler...");
    handle.stop().await;

    Ok(result?)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use actix_web::{App, http::StatusCode, test};
    use async_trait::async_trait;
    use disaster_feed_disaster_models::{DisasterCategory, Severity};
    use disaster_feed_geocoder::{
        AddressComponents, GeocodeCandidate, GeocodeError, ReverseGeocode,
    };
    use disaster_feed_source::{DisasterSource, FetchOptions, RawRecord, SourceError};
    use disaster_feed_source_models::{Coordinates, NormalizedDisaster};

    use super::*;

    /// Serves a fixed set of records.
    struct FixtureSource {
        records: Vec<NormalizedDisaster>,
    }

    #[async_trait]
    impl DisasterSource for FixtureSource {
        fn id(&self) -> &str {
            "fixture"
        }

        fn category(&self) -> DisasterCategory {
            DisasterCategory::Other
        }

        async fn fetch_raw(&self, _options: &FetchOptions) -> Result<Vec<RawRecord>, SourceError> {
            Ok(vec![RawRecord::new(serde_json::Value::Null); self.records.len()])
        }

        fn normalize(&self, _records: &[RawRecord]) -> Vec<NormalizedDisaster> {
            self.records.clone()
        }
    }

    /// Answers reverse lookups for Sylhet only, and fails searches.
    struct FixtureGeocoder;

    #[async_trait]
    impl Geocoder for FixtureGeocoder {
        async fn reverse(
            &self,
            coordinates: Coordinates,
        ) -> Result<Option<ReverseGeocode>, GeocodeError> {
            if (coordinates.latitude - 24.9).abs() < 0.01 {
                Ok(Some(ReverseGeocode {
                    display_address: "Sylhet, Bangladesh".to_string(),
                    components: AddressComponents {
                        city: Some("Sylhet".to_string()),
                        ..AddressComponents::default()
                    },
                }))
            } else {
                Err(GeocodeError::RateLimited)
            }
        }

        async fn search(&self, _query: &str) -> Result<Vec<GeocodeCandidate>, GeocodeError> {
            Err(GeocodeError::RateLimited)
        }
    }

    fn disaster(
        id: &str,
        category: DisasterCategory,
        severity: u8,
        visible: bool,
    ) -> NormalizedDisaster {
        NormalizedDisaster {
            id: id.to_string(),
            source_id: "fixture".to_string(),
            category,
            title: category.label().to_string(),
            location_text: "Sylhet".to_string(),
            coordinates: Coordinates::checked(24.9, 91.87),
            severity: Severity::from(severity),
            occurred_at: None,
            visible,
            details: BTreeMap::new(),
        }
    }

    async fn state() -> web::Data<AppState> {
        let source = FixtureSource {
            records: vec![
                disaster("f1", DisasterCategory::Flood, 8, true),
                disaster("f2", DisasterCategory::Flood, 3, true),
                disaster("c1", DisasterCategory::Cyclone, 6, true),
                disaster("hidden", DisasterCategory::Cyclone, 9, false),
            ],
        };
        let scheduler =
            RefreshScheduler::new(Arc::new(Aggregator::new(vec![Arc::new(source)])));
        scheduler.refresh_now().await;

        web::Data::new(AppState {
            scheduler,
            sources: registry::all_sources()
                .iter()
                .map(SourceDefinition::config)
                .collect(),
            risk: RiskEngine::seeded(42),
            geocoder: Arc::new(FixtureGeocoder),
        })
    }

    macro_rules! app {
        () => {
            test::init_service(App::new().app_data(state().await).configure(configure)).await
        };
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let app = app!();
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["healthy"], true);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[actix_web::test]
    async fn lists_categories_and_sources() {
        let app = app!();
        let req = test::TestRequest::get().uri("/api/categories").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 7);

        let req = test::TestRequest::get().uri("/api/sources").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 7);
        assert_eq!(body[0]["sourceType"], "FIRESTORE");
    }

    #[actix_web::test]
    async fn serves_only_visible_disasters() {
        let app = app!();
        let req = test::TestRequest::get().uri("/api/disasters").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let ids: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["c1", "f1", "f2"]);
    }

    #[actix_web::test]
    async fn filters_by_category_and_severity() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/api/disasters?category=FLOOD&minSeverity=5&visibleOnly=true")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let disasters = body.as_array().unwrap();
        assert_eq!(disasters.len(), 1);
        assert_eq!(disasters[0]["id"], "f1");
        assert_eq!(disasters[0]["markerColor"], "red");
    }

    #[actix_web::test]
    async fn rejects_hidden_requests_and_bad_filters() {
        let app = app!();
        for uri in [
            "/api/disasters?visibleOnly=false",
            "/api/disasters?category=volcano",
            "/api/disasters?minSeverity=11",
            "/api/disasters.geojson?category=volcano",
        ] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    #[actix_web::test]
    async fn serves_geojson_marker_layer() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/api/disasters.geojson?category=cyclone")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "application/geo+json"
        );
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["type"], "FeatureCollection");
        assert_eq!(body["features"].as_array().unwrap().len(), 1);
        assert_eq!(body["features"][0]["geometry"]["coordinates"][0], 91.87);
    }

    #[actix_web::test]
    async fn assesses_risk() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/api/risk?lat=22.0&lng=89.5")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let cyclone = body["cycloneRisk"].as_u64().unwrap();
        assert!((6..=10).contains(&cyclone));
        assert_eq!(body["regions"][0], "coastal");
    }

    #[actix_web::test]
    async fn rejects_invalid_risk_queries() {
        let app = app!();
        for uri in ["/api/risk?lat=91&lng=92", "/api/risk?lat=22.0", "/api/risk"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    #[actix_web::test]
    async fn reports_and_refreshes_snapshot() {
        let app = app!();
        let req = test::TestRequest::get().uri("/api/snapshot").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["cycle"], 1);
        assert_eq!(body["stale"], false);
        assert_eq!(body["recordCount"], 3);
        assert_eq!(body["sources"][0]["hidden"], 1);

        let req = test::TestRequest::post().uri("/api/refresh").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["cycle"], 2);
    }

    #[actix_web::test]
    async fn reverse_geocode_falls_back_to_coordinates() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/api/geocode/reverse?lat=24.9&lng=91.87")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["label"], "Sylhet, Bangladesh");
        assert_eq!(body["resolved"], true);
        assert_eq!(body["components"]["city"], "Sylhet");

        let req = test::TestRequest::get()
            .uri("/api/geocode/reverse?lat=22.0&lng=89.5")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["label"], "22.0000, 89.5000");
        assert_eq!(body["resolved"], false);
    }

    #[actix_web::test]
    async fn geocode_search_degrades_to_empty() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/api/geocode/search?q=Dhaka")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, serde_json::json!([]));

        let req = test::TestRequest::get()
            .uri("/api/geocode/search?q=%20")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}

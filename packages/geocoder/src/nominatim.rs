//! Nominatim / OpenStreetMap geocoder client.
//!
//! The public instance allows **1 request per second** and requires an
//! identifying `User-Agent`; deployments with real traffic should point
//! `base_url` at their own instance.
//!
//! See <https://nominatim.org/release-docs/develop/api/Overview/>

use async_trait::async_trait;
use disaster_feed_source_models::Coordinates;

use crate::{AddressComponents, GeocodeCandidate, GeocodeError, Geocoder, ReverseGeocode};

/// Public Nominatim instance.
pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Maximum number of search candidates requested.
pub const SEARCH_LIMIT: &str = "5";

const USER_AGENT: &str = concat!("disaster-feed/", env!("CARGO_PKG_VERSION"));

/// Geocoder backed by a Nominatim instance.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    country_codes: Option<String>,
}

impl NominatimGeocoder {
    /// Creates a client for the instance at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Creates a geocoder reusing an existing HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            country_codes: None,
        }
    }

    /// Restricts searches to comma-separated ISO country codes (e.g. `"bd"`).
    #[must_use]
    pub fn with_country_codes(mut self, codes: &str) -> Self {
        self.country_codes = Some(codes.to_string());
        self
    }

    fn search_params<'a>(&'a self, query: &'a str) -> Vec<(&'static str, &'a str)> {
        let mut params = vec![("q", query), ("limit", SEARCH_LIMIT)];
        if let Some(codes) = &self.country_codes {
            params.push(("countrycodes", codes.as_str()));
        }
        params
    }

    async fn get_json(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, GeocodeError> {
        let resp = self
            .client
            .get(format!("{}/{path}", self.base_url))
            .query(query)
            .query(&[("format", "jsonv2")])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }

        Ok(resp.error_for_status()?.json().await?)
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn reverse(
        &self,
        coordinates: Coordinates,
    ) -> Result<Option<ReverseGeocode>, GeocodeError> {
        let lat = coordinates.latitude.to_string();
        let lon = coordinates.longitude.to_string();
        let body = self
            .get_json("reverse", &[("lat", lat.as_str()), ("lon", lon.as_str())])
            .await?;
        parse_reverse(&body)
    }

    async fn search(&self, query: &str) -> Result<Vec<GeocodeCandidate>, GeocodeError> {
        let body = self
            .get_json("search", &self.search_params(query))
            .await?;
        let candidates = parse_search(&body)?;
        log::debug!("Nominatim: {} candidates for '{query}'", candidates.len());
        Ok(candidates)
    }
}

/// Parses a Nominatim `reverse` response.
///
/// Nominatim answers `{"error": "Unable to geocode"}` for points with no
/// address (open sea), which maps to `None`.
fn parse_reverse(body: &serde_json::Value) -> Result<Option<ReverseGeocode>, GeocodeError> {
    if !body.is_object() {
        return Err(GeocodeError::Parse {
            message: "Nominatim reverse response is not an object".to_string(),
        });
    }
    if body.get("error").is_some() {
        return Ok(None);
    }

    let display_address = body["display_name"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing display_name in Nominatim response".to_string(),
        })?;

    let address = &body["address"];
    let field = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| address[*k].as_str())
            .map(String::from)
    };

    Ok(Some(ReverseGeocode {
        display_address,
        components: AddressComponents {
            road: field(&["road", "pedestrian", "footway"]),
            suburb: field(&["suburb", "neighbourhood", "quarter"]),
            city: field(&["city", "town", "village", "hamlet"]),
            district: field(&["state_district", "county", "city_district"]),
            state: field(&["state", "region"]),
            country: field(&["country"]),
            postcode: field(&["postcode"]),
        },
    }))
}

/// Parses a Nominatim `search` response.
fn parse_search(body: &serde_json::Value) -> Result<Vec<GeocodeCandidate>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    results
        .iter()
        .map(|result| {
            let lat = parse_coordinate(result, "lat")?;
            let lon = parse_coordinate(result, "lon")?;
            let coordinates =
                Coordinates::checked(lat, lon).ok_or_else(|| GeocodeError::Parse {
                    message: format!("Out-of-range coordinates ({lat}, {lon})"),
                })?;
            Ok(GeocodeCandidate {
                coordinates,
                display_name: result["display_name"].as_str().unwrap_or_default().to_string(),
                kind: result["addresstype"]
                    .as_str()
                    .or_else(|| result["type"].as_str())
                    .map(String::from),
            })
        })
        .collect()
}

fn parse_coordinate(result: &serde_json::Value, key: &str) -> Result<f64, GeocodeError> {
    result[key]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: format!("Missing {key} in Nominatim response"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reverse_result() {
        let body = serde_json::json!({
            "lat": "24.8949",
            "lon": "91.8687",
            "display_name": "Zindabazar, Sylhet, Sylhet Division, 3100, Bangladesh",
            "address": {
                "suburb": "Zindabazar",
                "city": "Sylhet",
                "state_district": "Sylhet District",
                "state": "Sylhet Division",
                "postcode": "3100",
                "country": "Bangladesh"
            }
        });
        let result = parse_reverse(&body).unwrap().unwrap();
        assert!(result.display_address.starts_with("Zindabazar"));
        assert_eq!(result.components.city.as_deref(), Some("Sylhet"));
        assert_eq!(
            result.components.district.as_deref(),
            Some("Sylhet District")
        );
        assert!(result.components.road.is_none());
    }

    #[test]
    fn parses_reverse_town_as_city() {
        let body = serde_json::json!({
            "display_name": "Teknaf, Cox's Bazar District",
            "address": {"town": "Teknaf"}
        });
        let result = parse_reverse(&body).unwrap().unwrap();
        assert_eq!(result.components.city.as_deref(), Some("Teknaf"));
    }

    #[test]
    fn reverse_without_address_is_none() {
        let body = serde_json::json!({"error": "Unable to geocode"});
        assert!(parse_reverse(&body).unwrap().is_none());
        assert!(parse_reverse(&serde_json::json!([])).is_err());
    }

    #[test]
    fn parses_search_results() {
        let body = serde_json::json!([
            {
                "lat": "22.3569",
                "lon": "91.7832",
                "display_name": "Chattogram, Chattogram Division, Bangladesh",
                "addresstype": "city"
            },
            {
                "lat": "22.3384",
                "lon": "91.8317",
                "display_name": "Chattogram Port",
                "type": "industrial"
            }
        ]);
        let results = parse_search(&body).unwrap();
        assert_eq!(results.len(), 2);
        assert!((results[0].coordinates.latitude - 22.3569).abs() < 1e-4);
        assert_eq!(results[0].kind.as_deref(), Some("city"));
        assert_eq!(results[1].kind.as_deref(), Some("industrial"));
    }

    #[test]
    fn parses_search_empty() {
        let body = serde_json::json!([]);
        assert!(parse_search(&body).unwrap().is_empty());
        assert!(parse_search(&serde_json::json!([{"lat": "x"}])).is_err());
    }

    #[test]
    fn country_codes_restrict_searches() {
        let geocoder = NominatimGeocoder::with_client(reqwest::Client::new(), "http://geo.local/");
        assert_eq!(
            geocoder.search_params("Sylhet"),
            vec![("q", "Sylhet"), ("limit", SEARCH_LIMIT)]
        );

        let geocoder = geocoder.with_country_codes("bd");
        assert_eq!(
            geocoder.search_params("Sylhet"),
            vec![("q", "Sylhet"), ("limit", SEARCH_LIMIT), ("countrycodes", "bd")]
        );
    }

    #[tokio::test]
    async fn unreachable_instance_is_an_http_error() {
        let geocoder = NominatimGeocoder::new("http://127.0.0.1:9").unwrap();
        let result = geocoder.search("Dhaka").await;
        assert!(matches!(result, Err(GeocodeError::Http(_))));
    }
}

//! Firestore REST collection fetcher.
//!
//! Lists every document of a collection through the `documents` endpoint,
//! following `nextPageToken` until the collection (or the configured
//! limit) is exhausted. Firestore wraps each field in a typed envelope
//! (`{"doubleValue": 6.1}`, `{"mapValue": {"fields": ...}}`); those are
//! decoded into plain JSON so the field-alias tables never see them.

use crate::retry::send_json;
use crate::{FetchOptions, RawRecord, SourceError};

/// Configuration for a Firestore fetch operation.
pub struct FirestoreConfig<'a> {
    /// REST API root (e.g. `"https://firestore.googleapis.com/v1"`).
    pub base_url: &'a str,
    /// Google Cloud project id.
    pub project_id: &'a str,
    /// Collection to list (e.g. `"earthquakes"`).
    pub collection: &'a str,
    /// Documents per page.
    pub page_size: u64,
    /// Optional web API key sent as `key`.
    pub api_key: Option<&'a str>,
    /// Label for log messages.
    pub label: &'a str,
}

impl FirestoreConfig<'_> {
    /// Full URL of the collection's `documents` listing.
    #[must_use]
    pub fn collection_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}",
            self.base_url.trim_end_matches('/'),
            self.project_id,
            self.collection
        )
    }
}

/// Lists all documents in a collection.
///
/// # Errors
///
/// Returns [`SourceError`] if an HTTP request fails or a page cannot be
/// decoded.
pub async fn fetch_firestore(
    config: &FirestoreConfig<'_>,
    options: &FetchOptions,
) -> Result<Vec<RawRecord>, SourceError> {
    let url = config.collection_url();
    let fetch_limit = options.limit.unwrap_or(u64::MAX);
    let mut records: Vec<RawRecord> = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let remaining = fetch_limit.saturating_sub(records.len() as u64);
        if remaining == 0 {
            break;
        }
        let page_size = remaining.min(config.page_size).to_string();

        log::debug!(
            "Fetching {} documents: have={}, pageSize={page_size}",
            config.label,
            records.len()
        );

        let body = send_json(
            || {
                let mut request = options
                    .client
                    .get(&url)
                    .query(&[("pageSize", page_size.as_str())]);
                if let Some(token) = &page_token {
                    request = request.query(&[("pageToken", token.as_str())]);
                }
                if let Some(key) = config.api_key {
                    request = request.query(&[("key", key)]);
                }
                request
            },
            &options.retry,
        )
        .await?;

        let (page, next) = parse_page(&body)?;
        let count = page.len();
        records.extend(page);

        match next {
            Some(token) if count > 0 => page_token = Some(token),
            _ => break,
        }
    }

    records.truncate(usize::try_from(fetch_limit).unwrap_or(usize::MAX));
    log::info!("Downloaded {} {} documents", records.len(), config.label);
    Ok(records)
}

/// Splits one listing page into records and the next page token.
///
/// An empty collection is answered with `{}`, which yields no records.
fn parse_page(
    body: &serde_json::Value,
) -> Result<(Vec<RawRecord>, Option<String>), SourceError> {
    if !body.is_object() {
        return Err(SourceError::Normalization {
            message: "Firestore listing response is not an object".to_string(),
        });
    }

    let records = body
        .get("documents")
        .and_then(serde_json::Value::as_array)
        .map(|docs| docs.iter().map(decode_document).collect())
        .unwrap_or_default();

    let next = body
        .get("nextPageToken")
        .and_then(serde_json::Value::as_str)
        .filter(|t| !t.is_empty())
        .map(String::from);

    Ok((records, next))
}

/// Decodes one Firestore document into a [`RawRecord`].
///
/// The document id is the last segment of `name`. `createTime` and
/// `updateTime` are copied into the body unless a field of the same name
/// exists, so they can serve as timestamp fallbacks.
#[must_use]
pub fn decode_document(document: &serde_json::Value) -> RawRecord {
    let document_id = document
        .get("name")
        .and_then(serde_json::Value::as_str)
        .and_then(|name| name.rsplit('/').next())
        .filter(|id| !id.is_empty())
        .map(String::from);

    let mut data = document
        .get("fields")
        .map_or_else(|| serde_json::json!({}), decode_fields);

    if let Some(obj) = data.as_object_mut() {
        for meta in ["createTime", "updateTime"] {
            if let Some(value) = document.get(meta)
                && !obj.contains_key(meta)
            {
                obj.insert(meta.to_string(), value.clone());
            }
        }
    }

    RawRecord { document_id, data }
}

/// Decodes a Firestore `fields` map into a plain JSON object.
fn decode_fields(fields: &serde_json::Value) -> serde_json::Value {
    let Some(map) = fields.as_object() else {
        return serde_json::json!({});
    };
    serde_json::Value::Object(
        map.iter()
            .map(|(key, value)| (key.clone(), decode_value(value)))
            .collect(),
    )
}

/// Decodes one typed Firestore value.
#[must_use]
pub fn decode_value(value: &serde_json::Value) -> serde_json::Value {
    let Some((kind, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
        return serde_json::Value::Null;
    };

    match kind.as_str() {
        "booleanValue" | "doubleValue" | "stringValue" | "timestampValue" | "bytesValue"
        | "referenceValue" => inner.clone(),
        // int64 is transported as a decimal string
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map_or_else(|| inner.clone(), serde_json::Value::from),
        "geoPointValue" => serde_json::json!({
            "latitude": inner.get("latitude").cloned().unwrap_or(serde_json::Value::Null),
            "longitude": inner.get("longitude").cloned().unwrap_or(serde_json::Value::Null),
        }),
        "arrayValue" => serde_json::Value::Array(
            inner
                .get("values")
                .and_then(serde_json::Value::as_array)
                .map(|values| values.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => inner
            .get("fields")
            .map_or_else(|| serde_json::json!({}), decode_fields),
        _ => serde_json::Value::Null,
    }
}

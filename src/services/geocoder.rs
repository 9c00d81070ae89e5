use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while reverse geocoding a coordinate
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Geocoder returned status {0}")]
    ApiError(u16),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Reverse geocoding client for a Nominatim-compatible `/reverse` endpoint
///
/// Turns a coordinate into a "City, State" label. Successful lookups are
/// kept in an in-memory cache keyed by the coordinate rounded to 5 places.
pub struct ReverseGeocoder {
    base_url: String,
    user_agent: String,
    client: Client,
    cache: moka::future::Cache<String, String>,
}

impl ReverseGeocoder {
    pub fn new(
        base_url: String,
        user_agent: String,
        timeout_secs: u64,
        cache_size: u64,
        cache_ttl_secs: u64,
    ) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        let cache = moka::future::CacheBuilder::new(cache_size)
            .time_to_live(Duration::from_secs(cache_ttl_secs))
            .build();

        Ok(Self {
            base_url,
            user_agent,
            client,
            cache,
        })
    }

    /// Look up a label, propagating every failure
    pub async fn lookup(&self, latitude: f64, longitude: f64) -> Result<String, GeocodeError> {
        let key = cache_key(latitude, longitude);
        if let Some(label) = self.cache.get(&key).await {
            tracing::trace!("Geocode cache hit: {}", key);
            return Ok(label);
        }

        let url = format!(
            "{}/reverse?format=jsonv2&zoom=10&addressdetails=1&lat={}&lon={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&latitude.to_string()),
            urlencoding::encode(&longitude.to_string()),
        );

        tracing::debug!("Reverse geocoding via: {}", url);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodeError::ApiError(response.status().as_u16()));
        }

        let json: Value = response.json().await?;
        let label = parse_label(&json)?;

        self.cache.insert(key, label.clone()).await;
        Ok(label)
    }

    /// Look up a label, degrading any failure to an empty string
    pub async fn label_for(&self, latitude: f64, longitude: f64) -> String {
        match self.lookup(latitude, longitude).await {
            Ok(label) => label,
            Err(e) => {
                tracing::warn!(
                    "Reverse geocoding failed for ({}, {}), leaving label empty: {}",
                    latitude,
                    longitude,
                    e
                );
                String::new()
            }
        }
    }

    pub fn cached_entries(&self) -> u64 {
        self.cache.entry_count()
    }
}

fn cache_key(latitude: f64, longitude: f64) -> String {
    format!("{:.5},{:.5}", latitude, longitude)
}

/// Build "City, State" from a Nominatim `address` block
fn parse_label(json: &Value) -> Result<String, GeocodeError> {
    let address = json
        .get("address")
        .and_then(|a| a.as_object())
        .ok_or_else(|| GeocodeError::InvalidResponse("Missing address object".into()))?;

    let field = |name: &str| {
        address
            .get(name)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    let locality = ["city", "town", "village", "hamlet", "county"]
        .into_iter()
        .find_map(field);
    let state = field("state");

    Ok(match (locality, state) {
        (Some(city), Some(state)) => format!("{}, {}", city, state),
        (Some(only), None) | (None, Some(only)) => only.to_string(),
        (None, None) => String::new(),
    })
}

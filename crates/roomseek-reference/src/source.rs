//! Reference data sources: the trait and its HTTP implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use roomseek_core::{Amenity, Error, Province, ReferenceConfig, Result};
use serde_json::Value;
use tracing::warn;

/// Source of the province list and the amenity catalog.
#[async_trait]
pub trait ReferenceDataSource: Send + Sync {
    async fn fetch_provinces(&self) -> Result<Vec<Province>>;
    async fn fetch_amenities(&self) -> Result<Vec<Amenity>>;
}

/// Fetches reference tables from the public province API and the backend.
pub struct HttpReferenceSource {
    provinces_url: String,
    amenities_url: String,
    timeout: Duration,
    client: Client,
}

impl HttpReferenceSource {
    pub fn new(
        provinces_url: impl Into<String>,
        amenities_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            provinces_url: provinces_url.into(),
            amenities_url: amenities_url.into(),
            timeout,
            client: Client::new(),
        }
    }

    pub fn from_config(config: &ReferenceConfig) -> Self {
        Self::new(
            config.provinces_url.clone(),
            config.amenities_url.clone(),
            config.timeout(),
        )
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::Http(format!("GET {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::Http(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::ReferenceData(format!("invalid JSON from {}: {}", url, e)))
    }
}

#[async_trait]
impl ReferenceDataSource for HttpReferenceSource {
    async fn fetch_provinces(&self) -> Result<Vec<Province>> {
        let body = self.get_json(&self.provinces_url).await?;
        parse_provinces(&body)
    }

    async fn fetch_amenities(&self) -> Result<Vec<Amenity>> {
        let body = self.get_json(&self.amenities_url).await?;
        Ok(parse_amenities(&body))
    }
}

/// Parse `{success, data: [{id, province, licensePlates}]}`.
pub fn parse_provinces(body: &Value) -> Result<Vec<Province>> {
    if body.get("success").and_then(Value::as_bool) != Some(true) {
        return Err(Error::ReferenceData(
            "provinces API returned unsuccessful response".into(),
        ));
    }

    let items = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::ReferenceData("provinces API returned no data".into()))?;

    Ok(items
        .iter()
        .filter_map(|item| {
            let id = scalar_string(item.get("id")?)?;
            let name = item.get("province")?.as_str()?.to_string();
            let license_plates = match item.get("licensePlates") {
                Some(Value::Array(plates)) => plates.iter().filter_map(scalar_string).collect(),
                Some(other) => scalar_string(other).into_iter().collect(),
                None => Vec::new(),
            };
            Some(Province {
                code: id.clone(),
                id,
                name,
                license_plates,
            })
        })
        .collect())
}

/// Parse the amenity catalog, tolerating the shapes the backend has used:
/// `{data: {amenities: [...]}}`, `{data: [...]}` and a bare array.
pub fn parse_amenities(body: &Value) -> Vec<Amenity> {
    let list = body
        .pointer("/data/amenities")
        .or_else(|| body.get("data"))
        .unwrap_or(body);

    let list = match list {
        Value::Object(map) => map.get("amenities").unwrap_or(list),
        _ => list,
    };

    let Some(items) = list.as_array() else {
        warn!("Amenities API returned non-array payload");
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let id = item.get("_id").or_else(|| item.get("id")).and_then(scalar_string)?;
            let name = item.get("name")?.as_str()?.to_string();
            let icon = item.get("icon").and_then(Value::as_str).map(String::from);
            Some(Amenity { id, name, icon })
        })
        .collect()
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

//! REST transaction store
//!
//! Queries a PostgREST-style HTTP endpoint (`GET /{table}?column=op.value`)
//! one page at a time using `offset`/`limit` parameters.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{PageRequest, TransactionStore};
use crate::types::{AnalyticsError, FetchError, RawServiceRecord, Result};

/// HTTP request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Columns requested from the transaction table
const SELECT_COLUMNS: &str = "client_id,visit_date,service_name,price,location_id,status";

fn default_table() -> String {
    "transaction_services".to_string()
}

fn default_order_by() -> String {
    "id".to_string()
}

/// Connection settings for [`RestStore`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestStoreConfig {
    /// Base URL of the REST API (e.g., "https://db.example.com/rest/v1")
    pub base_url: String,
    #[serde(default = "default_table")]
    pub table: String,
    /// Column giving a stable row order for offset pagination
    #[serde(default = "default_order_by")]
    pub order_by: String,
    /// Environment variable holding the API key, if the endpoint needs one
    #[serde(default)]
    pub api_key_env: Option<String>,
}

impl RestStoreConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            table: default_table(),
            order_by: default_order_by(),
            api_key_env: None,
        }
    }
}

/// Blocking HTTP store
pub struct RestStore {
    config: RestStoreConfig,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
}

impl RestStore {
    pub fn new(config: RestStoreConfig) -> Result<Self> {
        let api_key = match &config.api_key_env {
            Some(var) => Some(std::env::var(var).map_err(|_| {
                AnalyticsError::Config(format!("environment variable {} is not set", var))
            })?),
            None => None,
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AnalyticsError::Config(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.table
        )
    }

    /// Query-string filters for one page
    fn query_params(&self, request: &PageRequest<'_>) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("select", SELECT_COLUMNS.to_string()),
            ("visit_date", format!("gte.{}", request.query.date_from)),
            ("visit_date", format!("lte.{}", request.query.date_to)),
            // Case-insensitive like the local stores; NULL status rows are kept
            (
                "or",
                format!(
                    "(status.is.null,status.not.ilike.{})",
                    like_literal(request.exclude_status)
                ),
            ),
            ("order", format!("{}.asc", self.config.order_by)),
            ("offset", request.offset.to_string()),
            ("limit", request.limit.to_string()),
        ];
        if let Some(location) = &request.query.location_id {
            params.push(("location_id", format!("eq.{}", location)));
        }
        params
    }
}

/// Escape LIKE wildcards so the value only matches itself
fn like_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl TransactionStore for RestStore {
    fn name(&self) -> &str {
        "rest"
    }

    fn fetch_page(
        &self,
        request: &PageRequest<'_>,
    ) -> std::result::Result<Vec<RawServiceRecord>, FetchError> {
        let mut http = self
            .client
            .get(self.endpoint())
            .query(&self.query_params(request));
        if let Some(key) = &self.api_key {
            http = http.header("apikey", key).bearer_auth(key);
        }

        let response = http
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchError::new(request.offset, format!("HTTP request failed: {}", e)))?;

        response
            .json::<Vec<RawServiceRecord>>()
            .map_err(|e| FetchError::new(request.offset, format!("JSON parse error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::CANCELLED_STATUS;
    use crate::types::AnalyticsQuery;
    use chrono::NaiveDate;

    fn store() -> RestStore {
        RestStore::new(RestStoreConfig::new("https://db.example.com/rest/v1/")).unwrap()
    }

    fn query() -> AnalyticsQuery {
        AnalyticsQuery::new(
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        )
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        assert_eq!(
            store().endpoint(),
            "https://db.example.com/rest/v1/transaction_services"
        );
    }

    #[test]
    fn test_query_params_without_location() {
        let q = query();
        let params = store().query_params(&PageRequest {
            query: &q,
            exclude_status: CANCELLED_STATUS,
            offset: 2000,
            limit: 1000,
        });

        assert!(params.contains(&("visit_date", "gte.2024-06-01".to_string())));
        assert!(params.contains(&("visit_date", "lte.2024-06-30".to_string())));
        assert!(params.contains(&("or", "(status.is.null,status.not.ilike.cancelled)".to_string())));
        assert!(params.contains(&("offset", "2000".to_string())));
        assert!(params.contains(&("limit", "1000".to_string())));
        assert!(params.contains(&("order", "id.asc".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "location_id"));
    }

    #[test]
    fn test_query_params_with_location() {
        let q = query().with_location("loc-7");
        let params = store().query_params(&PageRequest {
            query: &q,
            exclude_status: CANCELLED_STATUS,
            offset: 0,
            limit: 1000,
        });
        assert!(params.contains(&("location_id", "eq.loc-7".to_string())));
    }

    #[test]
    fn test_missing_api_key_env_is_config_error() {
        let mut config = RestStoreConfig::new("https://db.example.com");
        config.api_key_env = Some("VISITLIFT_TEST_SURELY_UNSET_KEY".into());
        let err = RestStore::new(config).err().unwrap();
        assert!(matches!(err, AnalyticsError::Config(_)));
    }

    #[test]
    fn test_like_literal_escapes_wildcards() {
        assert_eq!(like_literal("cancelled"), "cancelled");
        assert_eq!(like_literal("no_show"), r"no\_show");
        assert_eq!(like_literal("50%"), r"50\%");
    }

    #[test]
    fn test_page_body_with_invalid_prices_parses() {
        // Same decoding `fetch_page` applies to a response body
        let body = r#"[
            {"client_id":"c1","visit_date":"2024-06-03","service_name":"Cut","price":"n/a"},
            {"client_id":"c1","visit_date":"2024-06-03","service_name":"Gloss","price":null},
            {"client_id":"c2","visit_date":"2024-06-04","service_name":"Trim","price":"30.50"}
        ]"#;
        let rows: Vec<RawServiceRecord> = serde_json::from_str(body).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].price.is_none());
        assert!(rows[1].price.is_none());
        assert_eq!(rows[2].price, Some(30.5));
    }

    #[test]
    fn test_config_defaults_from_json() {
        let config: RestStoreConfig =
            serde_json::from_str(r#"{"base_url":"https://db.example.com"}"#).unwrap();
        assert_eq!(config.table, "transaction_services");
        assert_eq!(config.order_by, "id");
        assert!(config.api_key_env.is_none());
    }
}

//! Raw transaction rows and the visits built from them

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

/// One service line as returned by a transaction store.
///
/// `client_id` and `service_name` are optional because the upstream store does
/// not enforce them; rows missing either are skipped during aggregation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawServiceRecord {
    #[serde(default)]
    pub client_id: Option<String>,
    pub visit_date: NaiveDate,
    #[serde(default)]
    pub service_name: Option<String>,
    /// Numeric price; non-numeric values deserialize as `None`
    #[serde(default, deserialize_with = "lenient_price")]
    pub price: Option<f64>,
    /// Location the service was performed at
    #[serde(default)]
    pub location_id: Option<String>,
    /// Transaction status (e.g., "completed", "cancelled")
    #[serde(default)]
    pub status: Option<String>,
}

impl RawServiceRecord {
    /// Client id if present and non-blank
    pub fn client(&self) -> Option<&str> {
        non_blank(self.client_id.as_deref())
    }

    /// Service name if present and non-blank
    pub fn service(&self) -> Option<&str> {
        non_blank(self.service_name.as_deref())
    }

    /// Price, with missing or non-finite values treated as 0
    pub fn price_or_zero(&self) -> f64 {
        match self.price {
            Some(p) if p.is_finite() => p,
            _ => 0.0,
        }
    }

    pub fn is_status(&self, status: &str) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(status))
    }
}

/// Accept numbers and numeric strings; anything else is no price
fn lenient_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Composite visit identity: one client on one calendar date
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VisitKey {
    pub client_id: String,
    pub visit_date: NaiveDate,
}

impl VisitKey {
    pub fn new(client_id: impl Into<String>, visit_date: NaiveDate) -> Self {
        Self {
            client_id: client_id.into(),
            visit_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    pub service_name: String,
    pub price: f64,
}

/// All services one client received on one date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Visit {
    pub key: VisitKey,
    /// Distinct service names, kept sorted
    pub services: BTreeSet<String>,
    /// Every line in arrival order, duplicates included
    pub line_items: Vec<LineItem>,
}

impl Visit {
    pub fn new(key: VisitKey) -> Self {
        Self {
            key,
            services: BTreeSet::new(),
            line_items: Vec::new(),
        }
    }

    pub fn add(&mut self, service_name: &str, price: f64) {
        if !self.services.contains(service_name) {
            self.services.insert(service_name.to_string());
        }
        self.line_items.push(LineItem {
            service_name: service_name.to_string(),
            price,
        });
    }

    pub fn distinct_services(&self) -> usize {
        self.services.len()
    }

    /// Two or more distinct services
    pub fn is_multi_service(&self) -> bool {
        self.services.len() > 1
    }

    /// Sum of every line item price, added in ascending order so the total
    /// does not depend on line arrival order
    pub fn ticket_total(&self) -> f64 {
        let mut prices: Vec<f64> = self.line_items.iter().map(|item| item.price).collect();
        prices.sort_by(f64::total_cmp);
        prices.iter().sum()
    }
}

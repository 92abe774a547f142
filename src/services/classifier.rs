//! Service-name to category classification
//!
//! The engine only depends on [`CategoryClassifier`]. [`KeywordClassifier`] is
//! the bundled implementation: an ordered rule table where the first rule with
//! a matching keyword wins. Memoization is opt-in through a caller-owned
//! [`ClassifierCache`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use crate::types::{AnalyticsError, Result, Visit};

/// Category for names no rule recognizes
pub const FALLBACK_CATEGORY: &str = "Other";

/// Maps a free-text service name to a canonical category.
///
/// Implementations must be deterministic and total: every input gets a
/// category, unrecognized names included.
pub trait CategoryClassifier: Send + Sync {
    fn classify(&self, service_name: &str) -> String;
}

impl<F> CategoryClassifier for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn classify(&self, service_name: &str) -> String {
        self(service_name)
    }
}

/// Distinct categories across a visit's services, sorted
pub fn visit_categories(visit: &Visit, classifier: &dyn CategoryClassifier) -> BTreeSet<String> {
    visit
        .services
        .iter()
        .map(|service| classifier.classify(service))
        .collect()
}

/// One category and the keywords that select it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: String,
    pub keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new(category: &str, keywords: &[&str]) -> Self {
        Self {
            category: category.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Built-in salon and spa rules, in priority order
pub fn default_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new(
            "Color",
            &[
                "color", "colour", "highlight", "lowlight", "balayage", "ombre", "gloss",
                "toner", "root touch-up", "foilayage",
            ],
        ),
        CategoryRule::new(
            "Hair",
            &[
                "haircut", "cut", "trim", "blowout", "blow dry", "style", "updo", "keratin",
                "perm", "extension",
            ],
        ),
        CategoryRule::new(
            "Nails",
            &["manicure", "pedicure", "mani", "pedi", "nail", "gel", "acrylic", "dip powder"],
        ),
        CategoryRule::new(
            "Skin",
            &[
                "facial", "peel", "microdermabrasion", "hydrafacial", "dermaplaning",
                "microneedling", "skin",
            ],
        ),
        CategoryRule::new(
            "Massage",
            &["massage", "deep tissue", "hot stone", "reflexology", "swedish"],
        ),
        CategoryRule::new("Waxing", &["wax", "waxing", "brazilian", "threading", "sugaring"]),
        CategoryRule::new("Lashes & Brows", &["lash", "brow", "lamination", "tint"]),
        CategoryRule::new("Makeup", &["makeup", "make-up", "bridal"]),
    ]
}

struct CompiledRule {
    category: String,
    pattern: Regex,
}

/// Case-insensitive whole-word keyword classifier.
///
/// Rules are tried in order; keywords match as whole words with an optional
/// plural suffix ("highlight" matches "Full Highlights").
pub struct KeywordClassifier {
    rules: Vec<CompiledRule>,
}

impl KeywordClassifier {
    pub fn new(rules: &[CategoryRule]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let alternatives: Vec<String> = rule
                .keywords
                .iter()
                .map(|k| k.trim())
                .filter(|k| !k.is_empty())
                .map(regex::escape)
                .collect();
            if alternatives.is_empty() {
                continue;
            }
            let source = format!(r"(?i)\b(?:{})(?:s|es)?\b", alternatives.join("|"));
            let pattern = Regex::new(&source).map_err(|e| {
                AnalyticsError::Config(format!("invalid rule for {}: {}", rule.category, e))
            })?;
            compiled.push(CompiledRule {
                category: rule.category.clone(),
                pattern,
            });
        }
        Ok(Self { rules: compiled })
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(&default_rules()).expect("built-in rules are escaped literals")
    }
}

impl CategoryClassifier for KeywordClassifier {
    fn classify(&self, service_name: &str) -> String {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(service_name))
            .map(|rule| rule.category.clone())
            .unwrap_or_else(|| FALLBACK_CATEGORY.to_string())
    }
}

/// Memo table for classifier results, owned by the caller
#[derive(Debug, Default)]
pub struct ClassifierCache {
    entries: Mutex<HashMap<String, String>>,
}

impl ClassifierCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

/// Classifier that consults a [`ClassifierCache`] before the wrapped classifier
pub struct CachedClassifier<'a> {
    inner: &'a dyn CategoryClassifier,
    cache: &'a ClassifierCache,
}

impl<'a> CachedClassifier<'a> {
    pub fn new(inner: &'a dyn CategoryClassifier, cache: &'a ClassifierCache) -> Self {
        Self { inner, cache }
    }
}

impl CategoryClassifier for CachedClassifier<'_> {
    fn classify(&self, service_name: &str) -> String {
        if let Ok(entries) = self.cache.entries.lock() {
            if let Some(category) = entries.get(service_name) {
                return category.clone();
            }
        }

        let category = self.inner.classify(service_name);
        if let Ok(mut entries) = self.cache.entries.lock() {
            entries.insert(service_name.to_string(), category.clone());
        }
        category
    }
}

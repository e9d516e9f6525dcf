//! In-memory product catalog with keyword lookups and prompt formatting.

#[cfg(test)]
mod tests;

pub mod intent;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::cache::TtlCache;
use crate::config::CatalogConfig;
use crate::search::keywords::{tokenize, trigger_matches};
use crate::{FaqError, Result};

pub use intent::{IntentKind, PlatformRoute, QuickIntent, classify_intent, route_platform};

const BUILTIN_CATALOG: &str = include_str!("default_catalog.json");
const DEFAULT_FORMAT_TTL: Duration = Duration::from_secs(600);
/// Most products suggested for a single routed intent.
pub const MAX_ROUTED_PRODUCTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    CoachingProgram,
    MealPlan,
    Supplement,
    Apparel,
    AppSubscription,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 5] = [
        ProductCategory::CoachingProgram,
        ProductCategory::MealPlan,
        ProductCategory::Supplement,
        ProductCategory::Apparel,
        ProductCategory::AppSubscription,
    ];

    /// Platform a category is sold on when the user names none.
    #[inline]
    pub fn default_platform(self) -> Platform {
        match self {
            ProductCategory::Supplement => Platform::Amazon,
            ProductCategory::AppSubscription => Platform::App,
            ProductCategory::CoachingProgram
            | ProductCategory::MealPlan
            | ProductCategory::Apparel => Platform::Store,
        }
    }
}

impl fmt::Display for ProductCategory {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match *self {
            ProductCategory::CoachingProgram => "coaching program",
            ProductCategory::MealPlan => "meal plan",
            ProductCategory::Supplement => "supplement",
            ProductCategory::Apparel => "apparel",
            ProductCategory::AppSubscription => "app subscription",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Store,
    Amazon,
    App,
}

impl fmt::Display for Platform {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Platform::Store => write!(f, "store"),
            Platform::Amazon => write!(f, "amazon"),
            Platform::App => write!(f, "app"),
        }
    }
}

/// How much product detail goes into prompt text.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Minimal,
    #[default]
    Standard,
    Detailed,
}

impl std::str::FromStr for Verbosity {
    type Err = FaqError;

    #[inline]
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "minimal" => Ok(Verbosity::Minimal),
            "standard" => Ok(Verbosity::Standard),
            "detailed" => Ok(Verbosity::Detailed),
            other => Err(FaqError::Catalog(format!("Unknown verbosity: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: ProductCategory,
    pub platform: Platform,
    pub price_cents: u32,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Product {
    /// Human-readable price, e.g. `$49.99` or `49.99 EUR`.
    #[inline]
    pub fn display_price(&self) -> String {
        if self.price_cents == 0 {
            return "Free".to_string();
        }
        let amount = format!("{}.{:02}", self.price_cents / 100, self.price_cents % 100);
        if self.currency.eq_ignore_ascii_case("USD") {
            format!("${}", amount)
        } else {
            format!("{} {}", amount, self.currency)
        }
    }

    /// Render one product at the given verbosity.
    ///
    /// Each level starts with the previous level's text, so output length is
    /// monotonic in verbosity.
    #[inline]
    pub fn format(&self, verbosity: Verbosity) -> String {
        let minimal = format!("- {} | {}", self.name, self.display_price());
        if verbosity == Verbosity::Minimal {
            return minimal;
        }

        let mut standard = format!("{} | {} on {}", minimal, self.category, self.platform);
        if !self.description.is_empty() {
            standard = format!("{} | {}", standard, self.description);
        }
        if verbosity == Verbosity::Standard {
            return standard;
        }

        let mut lines = vec![standard];
        if !self.features.is_empty() {
            lines.push(format!("  Features: {}", self.features.join(", ")));
        }
        if let Some(url) = &self.url {
            lines.push(format!("  Link: {}", url));
        }
        lines.push(format!("  ID: {}", self.id));
        lines.join("\n")
    }

    fn relevance(&self, tokens: &[String], lower_query: &str) -> usize {
        let keyword_hits = self
            .keywords
            .iter()
            .filter(|keyword| trigger_matches(&keyword.to_lowercase(), lower_query, tokens))
            .count();
        let name = self.name.to_lowercase();
        let name_hits = tokens
            .iter()
            .filter(|token| token.len() > 3 && name.contains(token.as_str()))
            .count();
        keyword_hits * 2 + name_hits
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FormatKey {
    ids: Vec<String>,
    verbosity: Verbosity,
}

/// Read-only product list with id, category, platform and keyword lookups.
pub struct ProductCatalog {
    products: Vec<Product>,
    by_id: HashMap<String, usize>,
    formatted: TtlCache<FormatKey, String>,
}

impl fmt::Debug for ProductCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProductCatalog")
            .field("products", &self.products.len())
            .finish()
    }
}

impl ProductCatalog {
    #[inline]
    pub fn from_products(products: Vec<Product>, format_ttl: Duration) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(products.len());
        for (index, product) in products.iter().enumerate() {
            if product.id.trim().is_empty() {
                return Err(FaqError::Catalog(format!(
                    "Product '{}' has an empty id",
                    product.name
                )));
            }
            if by_id.insert(product.id.clone(), index).is_some() {
                return Err(FaqError::Catalog(format!(
                    "Duplicate product id: {}",
                    product.id
                )));
            }
        }

        Ok(Self {
            products,
            by_id,
            formatted: TtlCache::new("catalog_format", format_ttl),
        })
    }

    /// The catalog compiled into the binary.
    #[inline]
    pub fn builtin() -> Result<Self> {
        let products: Vec<Product> = serde_json::from_str(BUILTIN_CATALOG)
            .map_err(|e| FaqError::Catalog(format!("Built-in catalog is invalid: {}", e)))?;
        Self::from_products(products, DEFAULT_FORMAT_TTL)
    }

    /// Load every `*.json` file (an array of products) in `dir`.
    #[inline]
    pub fn load(dir: &Path, format_ttl: Duration) -> Result<Self> {
        let mut files: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();

        let mut products = Vec::new();
        for file in &files {
            let content = std::fs::read_to_string(file)?;
            let mut batch: Vec<Product> = serde_json::from_str(&content).map_err(|e| {
                FaqError::Catalog(format!("Failed to parse {}: {}", file.display(), e))
            })?;
            debug!("Loaded {} products from {}", batch.len(), file.display());
            products.append(&mut batch);
        }

        info!(
            "Loaded {} products from {} catalog files",
            products.len(),
            files.len()
        );
        Self::from_products(products, format_ttl)
    }

    /// Configured directory if set, otherwise the built-in catalog.
    #[inline]
    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        let ttl = Duration::from_secs(config.format_ttl_secs);
        match &config.path {
            Some(dir) => Self::load(dir, ttl),
            None => {
                let mut catalog = Self::builtin()?;
                catalog.formatted = TtlCache::new("catalog_format", ttl);
                Ok(catalog)
            }
        }
    }

    #[inline]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<&Product> {
        self.by_id.get(id).and_then(|&index| self.products.get(index))
    }

    #[inline]
    pub fn by_category(&self, category: ProductCategory) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|product| product.category == category)
            .collect()
    }

    #[inline]
    pub fn by_platform(&self, platform: Platform) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|product| product.platform == platform)
            .collect()
    }

    /// Products whose keywords or name match `query`, best first.
    #[inline]
    pub fn search(&self, query: &str, limit: usize) -> Vec<&Product> {
        let lower = query.to_lowercase();
        let tokens = tokenize(&lower);
        if tokens.is_empty() {
            return Vec::new();
        }

        self.products
            .iter()
            .map(|product| (product.relevance(&tokens, &lower), product))
            .filter(|(score, _)| *score > 0)
            // stable sort keeps catalog order among equal scores
            .sorted_by(|a, b| b.0.cmp(&a.0))
            .take(limit)
            .map(|(_, product)| product)
            .collect()
    }

    /// Prompt text for the given products; unknown ids are skipped.
    ///
    /// Output is cached per id list and verbosity.
    #[inline]
    pub fn format_for_ai<S: AsRef<str>>(&self, ids: &[S], verbosity: Verbosity) -> String {
        let key = FormatKey {
            ids: ids.iter().map(|id| id.as_ref().to_string()).collect(),
            verbosity,
        };
        if let Some(cached) = self.formatted.get(&key) {
            return cached;
        }

        let formatted = key
            .ids
            .iter()
            .filter_map(|id| {
                let product = self.get(id);
                if product.is_none() {
                    debug!("Skipping unknown product id {}", id);
                }
                product
            })
            .map(|product| product.format(verbosity))
            .join("\n");

        self.formatted.insert(key, formatted.clone());
        formatted
    }

    #[inline]
    pub fn cached_formats(&self) -> usize {
        self.formatted.len()
    }
}

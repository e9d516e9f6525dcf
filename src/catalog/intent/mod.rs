//! Keyword intent classification and platform routing.


use serde::{Deserialize, Serialize};
use std::fmt;

use super::{MAX_ROUTED_PRODUCTS, Platform, ProductCatalog, ProductCategory};
use crate::search::keywords::{tokenize, trigger_matches};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    ProductSearch,
    Recommendation,
    Pricing,
    Comparison,
    Support,
    General,
}

impl fmt::Display for IntentKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match *self {
            IntentKind::ProductSearch => "product_search",
            IntentKind::Recommendation => "recommendation",
            IntentKind::Pricing => "pricing",
            IntentKind::Comparison => "comparison",
            IntentKind::Support => "support",
            IntentKind::General => "general",
        };
        f.write_str(label)
    }
}

/// Result of a quick keyword classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickIntent {
    pub kind: IntentKind,
    pub category: Option<ProductCategory>,
    pub platform: Option<Platform>,
    pub confidence: f32,
    pub matched_keywords: Vec<String>,
}

impl QuickIntent {
    #[inline]
    pub fn is_commercial(&self) -> bool {
        self.kind != IntentKind::General
    }
}

/// Where to send the user and what to show them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformRoute {
    pub platform: Platform,
    pub product_ids: Vec<String>,
}

// Listed in tie-break order
const KIND_RULES: &[(IntentKind, &[&str])] = &[
    (
        IntentKind::Support,
        &[
            "refund", "cancel", "my order", "an order", "order status", "orders", "shipping",
            "delivery", "login", "password", "account", "billing", "broken", "return",
            "help with my",
        ],
    ),
    (
        IntentKind::Comparison,
        &[
            "vs", "versus", "compare", "comparison", "difference", "better than",
            "which is better",
        ],
    ),
    (
        IntentKind::Pricing,
        &[
            "price", "cost", "expensive", "cheap", "discount", "coupon", "deal", "pay",
            "how much is", "how much does",
        ],
    ),
    (
        IntentKind::Recommendation,
        &[
            "recommend", "suggest", "best", "should i buy", "should i get", "good for",
        ],
    ),
    (
        IntentKind::ProductSearch,
        &[
            "buy", "buying", "product", "sell", "selling", "purchase", "available", "offer",
            "looking for",
        ],
    ),
];

const CATEGORY_RULES: &[(ProductCategory, &[&str])] = &[
    (
        ProductCategory::CoachingProgram,
        &["coaching", "coach", "program", "contest prep", "training plan", "workout plan"],
    ),
    (
        ProductCategory::MealPlan,
        &["meal plan", "meal", "recipe", "diet plan", "nutrition plan"],
    ),
    (
        ProductCategory::Supplement,
        &[
            "supplement", "protein powder", "whey", "creatine", "vitamin", "pre-workout",
            "preworkout",
        ],
    ),
    (
        ProductCategory::Apparel,
        &["shirt", "tee", "hoodie", "apparel", "clothing", "merch", "shorts"],
    ),
    (
        ProductCategory::AppSubscription,
        &["subscription", "premium", "membership", "monthly plan", "annual plan"],
    ),
];

const PLATFORM_RULES: &[(Platform, &[&str])] = &[
    (Platform::Amazon, &["amazon", "prime"]),
    (Platform::App, &["app", "iphone", "android", "ios", "mobile"]),
    (Platform::Store, &["store", "shop", "shopping", "website"]),
];

/// Single-word triggers this short only match a whole token or its plural.
const SHORT_TRIGGER_LEN: usize = 4;

/// Like [`trigger_matches`], but short words such as "pay" or "tee" must not
/// fire inside "paying" or "teeth".
fn intent_trigger_matches(trigger: &str, lower: &str, tokens: &[String]) -> bool {
    let single_word = !trigger.contains([' ', ':', '-']);
    if single_word && trigger.len() <= SHORT_TRIGGER_LEN {
        tokens.iter().any(|token| {
            token == trigger || token.strip_suffix('s').is_some_and(|stem| stem == trigger)
        })
    } else {
        trigger_matches(trigger, lower, tokens)
    }
}

/// Best-scoring label of `rules` and the triggers it matched; earlier rules
/// win ties.
fn best_match<T: Copy>(
    rules: &[(T, &[&'static str])],
    lower: &str,
    tokens: &[String],
) -> Option<(T, Vec<&'static str>)> {
    let mut best: Option<(T, Vec<&'static str>)> = None;
    for (label, triggers) in rules {
        let hits: Vec<&'static str> = triggers
            .iter()
            .copied()
            .filter(|trigger| intent_trigger_matches(trigger, lower, tokens))
            .collect();
        let better = !hits.is_empty()
            && best
                .as_ref()
                .is_none_or(|(_, best_hits)| hits.len() > best_hits.len());
        if better {
            best = Some((*label, hits));
        }
    }
    best
}

/// Classify `query` with keyword tables.
///
/// Confidence is `min(1, 0.3 + 0.2 * matches)` for a recognised intent and
/// zero for [`IntentKind::General`].
#[inline]
pub fn classify_intent(query: &str) -> QuickIntent {
    let lower = query.to_lowercase();
    let tokens = tokenize(&lower);

    let kind = best_match(KIND_RULES, &lower, &tokens);
    let category = best_match(CATEGORY_RULES, &lower, &tokens);
    let platform = best_match(PLATFORM_RULES, &lower, &tokens);

    let matched_keywords: Vec<String> = [
        kind.as_ref().map(|(_, hits)| hits),
        category.as_ref().map(|(_, hits)| hits),
        platform.as_ref().map(|(_, hits)| hits),
    ]
    .into_iter()
    .flatten()
    .flatten()
    .map(|hit| (*hit).to_string())
    .collect();

    let kind = match (&kind, &category) {
        (Some((kind, _)), _) => *kind,
        (None, Some(_)) => IntentKind::ProductSearch,
        (None, None) => IntentKind::General,
    };

    let confidence = if kind == IntentKind::General {
        0.0
    } else {
        (0.3 + 0.2 * matched_keywords.len() as f32).min(1.0)
    };

    QuickIntent {
        kind,
        category: category.map(|(category, _)| category),
        platform: platform.map(|(platform, _)| platform),
        confidence,
        matched_keywords,
    }
}

/// Pick a platform and up to three catalog products for `intent`.
#[inline]
pub fn route_platform(intent: &QuickIntent, catalog: &ProductCatalog) -> PlatformRoute {
    let platform = intent
        .platform
        .or_else(|| intent.category.map(ProductCategory::default_platform))
        .unwrap_or(Platform::Store);

    if !intent.is_commercial() {
        return PlatformRoute {
            platform,
            product_ids: Vec::new(),
        };
    }

    let candidates: Vec<_> = match intent.category {
        Some(category) => catalog.by_category(category),
        None if intent.platform.is_some() => catalog.by_platform(platform),
        None => Vec::new(),
    };

    // Prefer products on the requested platform, but never route to nothing
    let on_platform: Vec<_> = candidates
        .iter()
        .filter(|product| product.platform == platform)
        .collect();
    let chosen: Vec<String> = if on_platform.is_empty() {
        candidates.iter().map(|product| product.id.clone()).collect()
    } else {
        on_platform.iter().map(|product| product.id.clone()).collect()
    };

    PlatformRoute {
        platform,
        product_ids: chosen.into_iter().take(MAX_ROUTED_PRODUCTS).collect(),
    }
}

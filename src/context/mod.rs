//! Prompt context assembled from FAQ search results and catalog routing.
//!
//! The rendered text is spliced into the assistant's system prompt, so every
//! section is plain markdown and empty sections are left out entirely.

#[cfg(test)]
mod tests;

use itertools::Itertools;
use serde::Serialize;
use tracing::debug;

use crate::catalog::{
    IntentKind, PlatformRoute, ProductCatalog, QuickIntent, Verbosity, classify_intent,
    route_platform,
};
use crate::search::{FaqResult, FaqSearcher};

pub const FAQ_SECTION_TITLE: &str = "Relevant FAQs";
pub const PRODUCT_SECTION_TITLE: &str = "Suggested products";

/// Render search results as the "Relevant FAQs" prompt block.
///
/// Returns an empty string for no results so callers can splice it in
/// unconditionally.
#[inline]
pub fn format_faq_context(results: &[FaqResult]) -> String {
    if results.is_empty() {
        return String::new();
    }

    let entries = results
        .iter()
        .enumerate()
        .map(|(index, result)| {
            format!(
                "{}. Q: {}\n   A: {}\n   Source: {}",
                index + 1,
                result.custom_metadata.question.trim(),
                result.custom_metadata.answer.trim(),
                result.source_doc_name
            )
        })
        .join("\n\n");

    format!("## {}\n\n{}", FAQ_SECTION_TITLE, entries)
}

/// Product detail level for an intent: comparisons and pricing questions get
/// the full listing, support requests the bare minimum.
#[inline]
pub fn verbosity_for(intent: &QuickIntent) -> Verbosity {
    match intent.kind {
        IntentKind::Comparison | IntentKind::Pricing => Verbosity::Detailed,
        IntentKind::Support => Verbosity::Minimal,
        IntentKind::ProductSearch | IntentKind::Recommendation | IntentKind::General => {
            Verbosity::Standard
        }
    }
}

/// Everything the assistant needs to answer one user message.
#[derive(Debug, Clone, Serialize)]
pub struct AssistantContext {
    pub query: String,
    pub intent: QuickIntent,
    pub faqs: Vec<FaqResult>,
    pub route: PlatformRoute,
    pub products: String,
}

impl AssistantContext {
    /// Classify the query, search FAQs and route it to catalog products.
    ///
    /// Inherits the searcher's failure model: backend errors show up as an
    /// empty FAQ list, never as an error.
    #[inline]
    pub async fn build(query: &str, searcher: &FaqSearcher, catalog: &ProductCatalog) -> Self {
        let intent = classify_intent(query);
        let faqs = searcher.search_default(query).await;
        let route = route_platform(&intent, catalog);
        let products = catalog.format_for_ai(&route.product_ids, verbosity_for(&intent));

        debug!(
            "Built context: intent={}, faqs={}, products={}",
            intent.kind,
            faqs.len(),
            route.product_ids.len()
        );

        Self {
            query: query.to_string(),
            intent,
            faqs,
            route,
            products,
        }
    }

    /// Markdown prompt text; empty when there is nothing to add.
    #[inline]
    pub fn render(&self) -> String {
        let mut sections = Vec::with_capacity(2);

        let faq_block = format_faq_context(&self.faqs);
        if !faq_block.is_empty() {
            sections.push(faq_block);
        }
        if !self.products.is_empty() {
            sections.push(format!(
                "## {} ({})\n\n{}",
                PRODUCT_SECTION_TITLE, self.route.platform, self.products
            ));
        }

        sections.join("\n\n")
    }
}

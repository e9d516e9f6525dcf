//! MCP tools
//!
//! FAQ search, intent classification, product formatting and full prompt
//! context, each exposed as a tool over the shared searcher and catalog.

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::Result;
use crate::catalog::{ProductCatalog, Verbosity, classify_intent, route_platform};
use crate::config::settings::MAX_MATCH_COUNT;
use crate::context::AssistantContext;
use crate::mcp::protocol::{CallToolParams, CallToolResult, Tool};
use crate::mcp::server::{McpServer, ToolHandler};
use crate::search::{ExpansionPolicy, FaqSearcher};

fn required_str<'a>(args: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn pretty(value: &Value) -> Result<CallToolResult> {
    Ok(CallToolResult::text(serde_json::to_string_pretty(value)?))
}

/// FAQ search tool handler
pub struct SearchFaqsHandler {
    searcher: FaqSearcher,
}

impl SearchFaqsHandler {
    #[inline]
    pub fn new(searcher: FaqSearcher) -> Self {
        Self { searcher }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "search_faqs".to_string(),
            description: Some(
                "Search the coaching FAQ knowledge base for answers relevant to a user question"
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The user's question"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results (default from configuration)",
                        "minimum": 1,
                        "maximum": MAX_MATCH_COUNT
                    },
                    "policy": {
                        "type": "string",
                        "enum": ["never", "always", "conditional"],
                        "description": "Query expansion policy (default from configuration)"
                    }
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for SearchFaqsHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args = params.arguments.unwrap_or_default();
        let Some(query) = required_str(&args, "query") else {
            return Ok(CallToolResult::error("Missing required parameter: query"));
        };

        let limit = args
            .get("limit")
            .and_then(Value::as_u64)
            .map_or(self.searcher.config().default_limit, |limit| {
                usize::try_from(limit).unwrap_or(MAX_MATCH_COUNT)
            })
            .clamp(1, MAX_MATCH_COUNT);

        let policy = match args.get("policy").and_then(Value::as_str) {
            Some(raw) => match ExpansionPolicy::from_str(raw) {
                Ok(policy) => policy,
                Err(e) => return Ok(CallToolResult::error(e.to_string())),
            },
            None => self.searcher.config().expansion_policy,
        };

        debug!(
            "search_faqs: query='{}', limit={}, policy={}",
            query, limit, policy
        );
        let outcome = self.searcher.search_with_outcome(query, limit, policy).await;

        let results: Vec<Value> = outcome
            .results
            .iter()
            .map(|result| {
                json!({
                    "question": result.custom_metadata.question,
                    "answer": result.custom_metadata.answer,
                    "source": result.source_doc_name,
                    "upsert_key": result.upsert_key,
                    "similarity": result.similarity
                })
            })
            .collect();

        pretty(&json!({
            "path": outcome.path,
            "reranked": outcome.reranked,
            "results": results
        }))
    }
}

/// Intent classification tool handler
pub struct ClassifyIntentHandler {
    catalog: Arc<ProductCatalog>,
}

impl ClassifyIntentHandler {
    #[inline]
    pub fn new(catalog: Arc<ProductCatalog>) -> Self {
        Self { catalog }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "classify_intent".to_string(),
            description: Some(
                "Classify a user message by shopping intent and route it to a sales platform"
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The user's message"
                    }
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for ClassifyIntentHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args = params.arguments.unwrap_or_default();
        let Some(query) = required_str(&args, "query") else {
            return Ok(CallToolResult::error("Missing required parameter: query"));
        };

        let intent = classify_intent(query);
        let route = route_platform(&intent, &self.catalog);
        pretty(&json!({ "intent": intent, "route": route }))
    }
}

/// Product formatting tool handler
pub struct FormatProductsHandler {
    catalog: Arc<ProductCatalog>,
}

impl FormatProductsHandler {
    #[inline]
    pub fn new(catalog: Arc<ProductCatalog>) -> Self {
        Self { catalog }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "format_products".to_string(),
            description: Some("Render catalog products as prompt text".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "ids": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Product ids; unknown ids are skipped"
                    },
                    "verbosity": {
                        "type": "string",
                        "enum": ["minimal", "standard", "detailed"],
                        "description": "Level of detail (default: standard)"
                    }
                },
                "required": ["ids"],
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for FormatProductsHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args = params.arguments.unwrap_or_default();
        let Some(ids) = args.get("ids").and_then(Value::as_array) else {
            return Ok(CallToolResult::error("Missing required parameter: ids"));
        };
        let ids: Vec<&str> = ids.iter().filter_map(Value::as_str).collect();

        let verbosity = match args.get("verbosity").and_then(Value::as_str) {
            Some(raw) => match Verbosity::from_str(raw) {
                Ok(verbosity) => verbosity,
                Err(e) => return Ok(CallToolResult::error(e.to_string())),
            },
            None => Verbosity::default(),
        };

        let text = self.catalog.format_for_ai(&ids, verbosity);
        if text.is_empty() {
            return Ok(CallToolResult::error("None of the requested products exist"));
        }
        Ok(CallToolResult::text(text))
    }
}

/// Full prompt context tool handler
pub struct BuildContextHandler {
    searcher: FaqSearcher,
    catalog: Arc<ProductCatalog>,
}

impl BuildContextHandler {
    #[inline]
    pub fn new(searcher: FaqSearcher, catalog: Arc<ProductCatalog>) -> Self {
        Self { searcher, catalog }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "build_context".to_string(),
            description: Some(
                "Build the system prompt context for a user message: relevant FAQs and suggested products"
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The user's message"
                    }
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for BuildContextHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args = params.arguments.unwrap_or_default();
        let Some(query) = required_str(&args, "query") else {
            return Ok(CallToolResult::error("Missing required parameter: query"));
        };

        let context = AssistantContext::build(query, &self.searcher, &self.catalog).await;
        let rendered = context.render();
        if rendered.is_empty() {
            return Ok(CallToolResult::text("No relevant FAQs or products found."));
        }
        Ok(CallToolResult::text(rendered))
    }
}

/// Register every tool on `server`.
#[inline]
pub async fn register_tools(server: &McpServer, searcher: FaqSearcher, catalog: Arc<ProductCatalog>) {
    server
        .register_tool(
            SearchFaqsHandler::tool_definition(),
            SearchFaqsHandler::new(searcher.clone()),
        )
        .await;
    server
        .register_tool(
            ClassifyIntentHandler::tool_definition(),
            ClassifyIntentHandler::new(Arc::clone(&catalog)),
        )
        .await;
    server
        .register_tool(
            FormatProductsHandler::tool_definition(),
            FormatProductsHandler::new(Arc::clone(&catalog)),
        )
        .await;
    server
        .register_tool(
            BuildContextHandler::tool_definition(),
            BuildContextHandler::new(searcher, catalog),
        )
        .await;
}

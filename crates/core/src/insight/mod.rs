pub mod model;
pub mod narrative;

use crate::config::{InsightMode, Settings};
use crate::domain::quote::MarketQuote;
use crate::llm::LlmClient;
use std::sync::Arc;

/// Chooses between the template narrative and the model-backed one.
#[derive(Clone)]
pub enum InsightGenerator {
    Template,
    Model(Arc<dyn LlmClient>),
}

impl InsightGenerator {
    /// Model mode without a usable client degrades to the template.
    pub fn from_settings(settings: &Settings) -> Self {
        if settings.insight_mode != InsightMode::Model {
            return InsightGenerator::Template;
        }
        match crate::llm::client_from_settings(settings) {
            Ok(llm) => InsightGenerator::Model(llm),
            Err(err) => {
                tracing::warn!(error = %err, "model insight unavailable; using template narrative");
                InsightGenerator::Template
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            InsightGenerator::Template => "template",
            InsightGenerator::Model(_) => "model",
        }
    }

    pub async fn generate(&self, quotes: &[MarketQuote]) -> String {
        match self {
            InsightGenerator::Template => narrative::generate_insights(quotes),
            InsightGenerator::Model(llm) => model::generate_model_insights(llm.as_ref(), quotes).await,
        }
    }
}

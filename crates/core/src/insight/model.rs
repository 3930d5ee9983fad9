use crate::domain::quote::MarketQuote;
use crate::llm::{ChatRequest, LlmClient};

const MAX_ROWS: usize = 10;

const SYSTEM_PROMPT: &str = "You are a concise crypto market analyst writing for a dashboard.";

fn table_text(quotes: &[MarketQuote]) -> String {
    let mut out = String::from("Name | Symbol | Price (USD) | 24h Change | 7d Change\n");
    for q in quotes.iter().take(MAX_ROWS) {
        out.push_str(&format!(
            "{} | {} | {} | {} | {}\n",
            q.name, q.symbol, q.price_usd, q.change_24h, q.change_7d
        ));
    }
    out
}

pub fn user_prompt(quotes: &[MarketQuote]) -> String {
    format!(
        "Here is the latest cryptocurrency market data:\n\n{}\n\
Write one short paragraph of market insight: call out the major coins, the stablecoins, \
the biggest 24h gainer and loser, and the overall mood. Do not give financial advice.",
        table_text(quotes)
    )
}

/// One model call, no retry. Failures come back as display text so the page
/// still renders.
pub async fn generate_model_insights(llm: &dyn LlmClient, quotes: &[MarketQuote]) -> String {
    if quotes.is_empty() {
        return super::narrative::NO_DATA_MESSAGE.to_string();
    }

    let req = ChatRequest::new(user_prompt(quotes))
        .system(SYSTEM_PROMPT)
        .temperature(0.5)
        .max_tokens(300);

    match llm.complete(req).await {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(provider = llm.provider().as_str(), error = %err, "model insight failed");
            format!("⚠️ AI insight unavailable: {err}")
        }
    }
}

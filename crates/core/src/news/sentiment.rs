use crate::domain::news::{NewsItem, SentimentLabel, SentimentPayload};
use crate::llm::json::parse_array;
use crate::llm::{ChatRequest, LlmClient};
use crate::storage::{self, Db};
use serde_json::Value;

/// Headlines per model call.
pub const BATCH_SIZE: usize = 5;

const SYSTEM_PROMPT: &str = "You classify crypto news headlines. Respond with JSON only.";

pub fn batch_prompt(headlines: &[&str]) -> String {
    let mut listed = String::new();
    for (i, h) in headlines.iter().enumerate() {
        listed.push_str(&format!("{}. {}\n", i + 1, h));
    }
    format!(
        "Classify the sentiment of each crypto news headline below as Positive, Negative, or Neutral.\n\n\
{listed}\n\
Respond with a JSON array only, one object per headline, in the same order:\n\
[{{\"headline\": \"...\", \"sentiment\": \"Positive|Negative|Neutral\", \"reason\": \"...\"}}]"
    )
}

/// One model call for up to [`BATCH_SIZE`] headlines. The result always has
/// exactly one entry per input; failures become neutral entries that carry
/// the cause in `reason`. Blank headlines are answered locally and never
/// reach the model.
pub async fn analyze_sentiment_batch(llm: &dyn LlmClient, headlines: &[&str]) -> Vec<SentimentPayload> {
    let mut out: Vec<Option<SentimentPayload>> = headlines
        .iter()
        .map(|h| h.trim().is_empty().then(|| SentimentPayload::neutral(EMPTY_TEXT_REASON)))
        .collect();

    let asked: Vec<&str> = headlines
        .iter()
        .copied()
        .filter(|h| !h.trim().is_empty())
        .collect();
    if !asked.is_empty() {
        let mut answers = classify_headlines(llm, &asked).await.into_iter();
        for slot in out.iter_mut().filter(|slot| slot.is_none()) {
            *slot = answers.next();
        }
    }

    out.into_iter()
        .map(|slot| slot.unwrap_or_else(|| SentimentPayload::neutral(MISSING_REASON)))
        .collect()
}

const EMPTY_TEXT_REASON: &str = "Empty text";
const MISSING_REASON: &str = "No result returned for this headline";

async fn classify_headlines(llm: &dyn LlmClient, headlines: &[&str]) -> Vec<SentimentPayload> {
    let req = ChatRequest::new(batch_prompt(headlines))
        .system(SYSTEM_PROMPT)
        .temperature(0.0)
        .max_tokens(150 * headlines.len() as u32);

    let reply = match llm.complete(req).await {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(batch = headlines.len(), error = %err, "sentiment call failed");
            return neutral_for_all(headlines.len(), &format!("{err}"));
        }
    };

    let items = match parse_array(&reply) {
        Ok(items) => items,
        Err(err) => {
            tracing::warn!(batch = headlines.len(), error = %err, "sentiment reply unusable");
            return neutral_for_all(headlines.len(), &format!("{err}"));
        }
    };

    if items.len() != headlines.len() {
        tracing::warn!(
            expected = headlines.len(),
            got = items.len(),
            "sentiment reply length mismatch; padding/truncating"
        );
    }

    let mut out: Vec<SentimentPayload> = items
        .iter()
        .take(headlines.len())
        .map(payload_from_value)
        .collect();
    while out.len() < headlines.len() {
        out.push(SentimentPayload::neutral(MISSING_REASON));
    }
    out
}

fn neutral_for_all(n: usize, reason: &str) -> Vec<SentimentPayload> {
    (0..n).map(|_| SentimentPayload::neutral(reason)).collect()
}

fn payload_from_value(v: &Value) -> SentimentPayload {
    let Some(obj) = v.as_object() else {
        return SentimentPayload::neutral("Malformed result entry");
    };
    let sentiment = obj
        .get("sentiment")
        .and_then(Value::as_str)
        .map(SentimentLabel::parse_lenient)
        .unwrap_or(SentimentLabel::Neutral);
    let reason = obj
        .get("reason")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    SentimentPayload { sentiment, reason }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentimentRunStats {
    pub classified: usize,
    pub batches: usize,
    pub skipped: usize,
}

/// Classifies the given rows in sequential batches and writes each result
/// back by row id. A row another session already filled is left alone.
pub async fn classify_pending(
    pool: &Db,
    llm: &dyn LlmClient,
    pending: &[NewsItem],
) -> anyhow::Result<SentimentRunStats> {
    let mut stats = SentimentRunStats::default();

    for chunk in pending.chunks(BATCH_SIZE) {
        stats.batches += 1;
        let headlines: Vec<&str> = chunk.iter().map(|n| n.title.as_str()).collect();
        let results = analyze_sentiment_batch(llm, &headlines).await;

        for (item, payload) in chunk.iter().zip(results.iter()) {
            let json = payload.to_json()?;
            if storage::news::set_sentiment(pool, item.id, &json).await? {
                stats.classified += 1;
            } else {
                stats.skipped += 1;
            }
        }
    }

    tracing::info!(
        classified = stats.classified,
        batches = stats.batches,
        skipped = stats.skipped,
        "sentiment run finished"
    );
    Ok(stats)
}

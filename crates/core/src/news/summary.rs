use crate::domain::news::NewsItem;
use crate::llm::{ChatRequest, LlmClient};

pub const NO_NEWS_MESSAGE: &str = "⚠️ No news articles fetched.";
pub const SUMMARY_FAILED_MESSAGE: &str = "⚠️ Could not generate summary.";

const MAX_TITLES: usize = 10;

pub fn summary_prompt(titles: &[&str]) -> String {
    let mut listed = String::new();
    for t in titles.iter().take(MAX_TITLES) {
        listed.push_str("- ");
        listed.push_str(t);
        listed.push('\n');
    }
    format!(
        "Summarize the overall crypto market narrative from these headlines in 2-3 sentences. \
Mention any recurring themes.\n\n{listed}"
    )
}

/// Short narrative over the first few headlines. Never fails; errors come back
/// as a fixed warning line.
pub async fn generate_news_summary(llm: &dyn LlmClient, items: &[NewsItem]) -> String {
    if items.is_empty() {
        return NO_NEWS_MESSAGE.to_string();
    }
    let titles: Vec<&str> = items.iter().map(|n| n.title.as_str()).collect();

    let req = ChatRequest::new(summary_prompt(&titles))
        .system("You are a crypto news editor.")
        .temperature(0.3)
        .max_tokens(300);

    match llm.complete(req).await {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(error = %err, "news summary failed");
            SUMMARY_FAILED_MESSAGE.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::fake::ScriptedLlm;

    fn item(i: usize) -> NewsItem {
        NewsItem {
            id: i as i64,
            title: format!("headline {i}"),
            link: format!("https://n.example/{i}"),
            published: None,
            summary: None,
            sentiment: None,
        }
    }

    #[tokio::test]
    async fn no_items_skips_the_model() {
        let llm = ScriptedLlm::new(vec![]);
        assert_eq!(generate_news_summary(&llm, &[]).await, NO_NEWS_MESSAGE);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn prompt_lists_at_most_ten_titles() {
        let items: Vec<NewsItem> = (0..15).map(item).collect();
        let llm = ScriptedLlm::new(vec![Ok("Markets are calm.".to_string())]);

        assert_eq!(generate_news_summary(&llm, &items).await, "Markets are calm.");
        let reqs = llm.requests.lock().unwrap();
        assert!(reqs[0].user.contains("- headline 9\n"));
        assert!(!reqs[0].user.contains("headline 10"));
        assert!((reqs[0].temperature - 0.3).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn model_failure_returns_warning() {
        let llm = ScriptedLlm::new(vec![Err(anyhow::anyhow!("503"))]);
        assert_eq!(
            generate_news_summary(&llm, &[item(1)]).await,
            SUMMARY_FAILED_MESSAGE
        );
    }
}

use serde_json::Value;

/// Drops a surrounding Markdown fence (```json ... ``` or ``` ... ```), if any.
pub fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let mut inner = trimmed;
    if let Some(after_first) = inner.splitn(2, '\n').nth(1) {
        inner = after_first;
    }
    if let Some(end) = inner.rfind("```") {
        inner = &inner[..end];
    }
    inner.trim()
}

/// First JSON value that starts at `text[start..]`; anything after it is ignored.
fn value_at(text: &str, start: usize) -> Option<Value> {
    serde_json::Deserializer::from_str(&text[start..])
        .into_iter::<Value>()
        .next()?
        .ok()
}

/// Finds the JSON array in a model reply. Bracketed prose before or after it
/// is skipped. An array of objects wins over an earlier array of scalars
/// such as `[1]`.
pub fn parse_array(text: &str) -> anyhow::Result<Vec<Value>> {
    let body = strip_fences(text);

    let mut first_array: Option<Vec<Value>> = None;
    for (i, _) in body.match_indices('[') {
        if let Some(Value::Array(items)) = value_at(body, i) {
            if !items.is_empty() && items.iter().all(Value::is_object) {
                return Ok(items);
            }
            first_array.get_or_insert(items);
        }
    }
    if let Some(items) = first_array {
        return Ok(items);
    }

    match serde_json::from_str::<Value>(body) {
        Ok(other) => anyhow::bail!("model reply is not a JSON array (got {})", json_type(&other)),
        Err(e) => anyhow::bail!("model reply is not valid JSON: {e}"),
    }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ROWS: &str = r#"[{"sentiment": "Positive"}, {"sentiment": "Neutral"}]"#;

    #[test]
    fn strips_fenced_blocks() {
        let fenced = format!("```json\n{ROWS}\n```\n");
        assert_eq!(strip_fences(&fenced), ROWS);
        assert_eq!(parse_array(&fenced).unwrap().len(), 2);
    }

    #[test]
    fn finds_array_inside_prose() {
        let s = format!("Here you go: {ROWS} done");
        assert_eq!(parse_array(&s).unwrap()[0], json!({"sentiment": "Positive"}));
    }

    #[test]
    fn ignores_bracketed_text_after_the_array() {
        let s = format!("{ROWS}\nLabels used: [Positive, Negative, Neutral].");
        assert_eq!(parse_array(&s).unwrap().len(), 2);
    }

    #[test]
    fn ignores_bracketed_text_before_the_array() {
        let s = format!("Results for batch [1/4]:\n{ROWS}");
        assert_eq!(parse_array(&s).unwrap().len(), 2);

        let s = format!("Batch [1] of [3]:\n{ROWS}");
        assert_eq!(parse_array(&s).unwrap()[1], json!({"sentiment": "Neutral"}));
    }

    #[test]
    fn scalar_array_is_returned_when_nothing_better_exists() {
        assert_eq!(parse_array("[1, 2, 3]").unwrap(), vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn rejects_objects() {
        let err = parse_array("{\"sentiment\": \"Positive\"}").unwrap_err();
        assert!(err.to_string().contains("not a JSON array"));
    }

    #[test]
    fn rejects_prose() {
        assert!(parse_array("I cannot help with that.").is_err());
        assert!(parse_array(r#"[{"sentiment": "Positive"#).is_err());
    }
}

use once_cell::sync::Lazy;
use regex::Regex;

static THINK_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<think>[\s\S]*?</think>|<think\s*/>").unwrap());

static REASONING_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<reasoning>[\s\S]*?</reasoning>").unwrap());

static INTERNAL_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<internal>[\s\S]*?</internal>").unwrap());

static MULTIPLE_NEWLINES_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Cleans LLM response by removing common artifacts and unwanted tags
pub fn clean_llm_response(response: &str) -> String {
    let mut cleaned = response.to_string();

    // Remove <think>...</think> and <think/> tags
    cleaned = THINK_TAG_PATTERN.replace_all(&cleaned, "").to_string();

    // Remove <reasoning>...</reasoning> tags (some models use this)
    cleaned = REASONING_TAG_PATTERN.replace_all(&cleaned, "").to_string();

    // Remove <internal>...</internal> tags
    cleaned = INTERNAL_TAG_PATTERN.replace_all(&cleaned, "").to_string();

    // Trim leading/trailing whitespace
    cleaned = cleaned.trim().to_string();

    // Collapse multiple consecutive newlines into at most two
    cleaned = MULTIPLE_NEWLINES_PATTERN
        .replace_all(&cleaned, "\n\n")
        .to_string();

    cleaned
}

/// Pulls the JSON payload out of a chat-completion envelope or a fenced
/// code block; returns the trimmed input when neither applies.
pub fn extract_json_payload(output: &str) -> String {
    let trimmed = output.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(content) = value
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
        {
            return strip_code_fence(content);
        }
        return trimmed.to_string();
    }
    strip_code_fence(trimmed)
}

fn strip_code_fence(value: &str) -> String {
    let trimmed = value.trim();
    if let Some(stripped) = trimmed.strip_prefix("```json") {
        return stripped.trim().trim_end_matches("```").trim().to_string();
    }
    if let Some(stripped) = trimmed.strip_prefix("```") {
        return stripped.trim().trim_end_matches("```").trim().to_string();
    }
    trimmed.to_string()
}

/// Short prefix of a payload for error context in logs.
pub fn preview_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let prefix: String = value.chars().take(max_chars).collect();
    format!("{}…", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_think_tags() {
        let input = "<think>Some reasoning here</think>The actual response";
        assert_eq!(clean_llm_response(input), "The actual response");
    }

    #[test]
    fn test_clean_self_closing_think() {
        let input = "<think/>The actual response";
        assert_eq!(clean_llm_response(input), "The actual response");
    }

    #[test]
    fn test_clean_reasoning_tags() {
        let input = "<reasoning>Internal reasoning</reasoning>Final answer";
        assert_eq!(clean_llm_response(input), "Final answer");
    }

    #[test]
    fn test_clean_multiple_newlines() {
        let input = "Line 1\n\n\n\n\nLine 2";
        assert_eq!(clean_llm_response(input), "Line 1\n\nLine 2");
    }

    #[test]
    fn test_extract_from_code_fence() {
        let input = "```json\n{\"scenarios\": []}\n```";
        assert_eq!(extract_json_payload(input), "{\"scenarios\": []}");
    }

    #[test]
    fn test_extract_from_chat_envelope() {
        let input = r#"{"choices":[{"message":{"content":"{\"scenarios\":[]}"}}]}"#;
        assert_eq!(extract_json_payload(input), "{\"scenarios\":[]}");
    }

    #[test]
    fn test_extract_passes_plain_json_through() {
        let input = "  {\"test_cases\": []} ";
        assert_eq!(extract_json_payload(input), "{\"test_cases\": []}");
    }

    #[test]
    fn test_preview_truncates() {
        assert_eq!(preview_text("abcdef", 3), "abc…");
        assert_eq!(preview_text("abc", 3), "abc");
    }
}

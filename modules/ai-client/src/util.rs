use serde::de::DeserializeOwned;

use crate::error::{AiError, Result};

/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Strip markdown code fences from a model response.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Parse a model response as JSON after stripping code fences. Models wrap
/// JSON in prose and fences often enough that raw `from_str` is not viable.
pub fn parse_json_lenient<T: DeserializeOwned>(response: &str) -> Result<T> {
    let cleaned = strip_code_blocks(response);
    serde_json::from_str(cleaned).map_err(|e| AiError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "Hello 世界";
        let truncated = truncate_to_char_boundary(text, 8);
        assert!(truncated.len() <= 8);
        assert!(text.starts_with(truncated));
    }

    #[test]
    fn truncate_within_bounds_is_identity() {
        assert_eq!(truncate_to_char_boundary("Hello", 100), "Hello");
    }

    #[test]
    fn strips_fenced_json() {
        assert_eq!(strip_code_blocks("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("```\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("{}"), "{}");
    }

    #[test]
    fn lenient_parse_handles_fences_and_rejects_garbage() {
        #[derive(serde::Deserialize)]
        struct Payload {
            n: u32,
        }
        let parsed: Payload = parse_json_lenient("```json\n{\"n\": 3}\n```").unwrap();
        assert_eq!(parsed.n, 3);
        assert!(parse_json_lenient::<Payload>("not json at all").is_err());
    }
}

//! Extraction of the executable payload from a model reply.
//!
//! Model replies usually wrap the interesting part in a triple-backtick
//! fenced block, often with a language tag on the fence line. Extraction
//! never fails: when no fence is present the raw reply is the payload.

use regex::Regex;
use std::sync::OnceLock;

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?s)```(.*?)```").expect("valid fence regex"))
}

/// Return the contents of the first fenced block with any language tag
/// removed, or the raw reply when there is no fenced block. The payload is
/// trimmed of surrounding whitespace either way; interior whitespace is
/// preserved.
pub fn extract_payload(reply: &str) -> String {
    let payload = match fence_regex().captures(reply) {
        Some(caps) => {
            let block = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            strip_language_tag(block)
        }
        None => reply,
    };
    payload.trim().to_string()
}

/// Drop the fence-line language tag (e.g. `sql`, `python`) when the first
/// line of the block is a lone tag token. Content on the fence line that is
/// not a single word (e.g. `SELECT 1`) is kept.
fn strip_language_tag(block: &str) -> &str {
    if let Some((first, rest)) = block.split_once('\n') {
        let tag = first.trim();
        let is_tag = !tag.is_empty()
            && tag
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '+');
        if is_tag {
            return rest;
        }
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_fenced_block_with_tag() {
        let reply = "Here you go:\n```sql\nSELECT count(*) FROM df\n```\nLet me know!";
        assert_eq!(extract_payload(reply), "SELECT count(*) FROM df");
    }

    #[test]
    fn test_extract_fenced_block_without_tag() {
        let reply = "```\nSELECT a FROM df\n```";
        assert_eq!(extract_payload(reply), "SELECT a FROM df");
    }

    #[test]
    fn test_extract_python_tag_stripped() {
        let reply = "```python\nfig = bar(x=country, y=sales)\nfig.show()\n```";
        assert_eq!(
            extract_payload(reply),
            "fig = bar(x=country, y=sales)\nfig.show()"
        );
    }

    #[test]
    fn test_no_fence_returns_trimmed_input() {
        assert_eq!(extract_payload("SELECT a FROM df"), "SELECT a FROM df");
        assert_eq!(extract_payload("  SELECT a FROM df\n"), "SELECT a FROM df");
    }

    #[test]
    fn test_first_of_several_blocks_wins() {
        let reply = "```sql\nSELECT 1\n```\ntext\n```sql\nSELECT 2\n```";
        assert_eq!(extract_payload(reply), "SELECT 1");
    }

    #[test]
    fn test_single_line_block_is_not_treated_as_tag() {
        // No newline inside the block, so nothing can be a tag line.
        let reply = "```SELECT 1```";
        assert_eq!(extract_payload(reply), "SELECT 1");
    }

    #[test]
    fn test_fence_line_with_content_kept() {
        // Interior newlines survive; only surrounding whitespace is trimmed.
        let reply = "```SELECT a\nFROM df\n```";
        assert_eq!(extract_payload(reply), "SELECT a\nFROM df");
    }

    #[test]
    fn test_empty_block() {
        assert_eq!(extract_payload("``````"), "");
    }
}

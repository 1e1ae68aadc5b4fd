//! Plain-text normalization of generated replies.
//!
//! Zalo renders messages as plain text, so markdown the model emits despite
//! the system instruction has to be rewritten before delivery. Each rewrite
//! rule below is independent; [`normalize`] applies them in a fixed order.
//! Fence stripping runs before inline-emphasis stripping so backtick pairs
//! cannot mangle a fence before its delimiters are removed.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Self-introduction openers the model sometimes prepends even when told
/// not to. Matched literally at the very start of the reply.
const INTRO_PREFIXES: &[&str] = &[
    "Chào bạn! Tôi là Gemini Bot.",
    "Xin chào! Tôi là Gemini Bot.",
    "Xin chào, tôi là Gemini Bot.",
    "Tôi là Gemini Bot.",
    "Là một trợ lý AI,",
    "Là một AI assistant,",
    "As an AI assistant,",
];

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[A-Za-z0-9_+\-]*\n?").expect("hardcoded regex"));
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("hardcoded regex"));
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.*?)\*").expect("hardcoded regex"));
static CODE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`\n]*)`").expect("hardcoded regex"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s+").expect("hardcoded regex"));
static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*[-*+]\s+").expect("hardcoded regex"));
static NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\d+\.\s+").expect("hardcoded regex"));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]*\)").expect("hardcoded regex"));
static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("hardcoded regex"));

/// Drop known self-introduction sentences from the very start of the text.
pub fn strip_intro_preamble(text: &str) -> &str {
    let mut rest = text.trim_start();
    loop {
        let Some(prefix) = INTRO_PREFIXES.iter().find(|p| rest.starts_with(**p)) else {
            return rest;
        };
        rest = rest[prefix.len()..].trim_start();
    }
}

/// Remove fenced code-block delimiters, preserving the enclosed code.
pub fn strip_code_fences(text: &str) -> Cow<'_, str> {
    FENCE.replace_all(text, "")
}

/// Remove bold, italic, and code-span delimiters, keeping inner text.
pub fn strip_inline_emphasis(text: &str) -> String {
    let text = BOLD.replace_all(text, "$1");
    let text = ITALIC.replace_all(&text, "$1");
    CODE_SPAN.replace_all(&text, "$1").into_owned()
}

/// Remove heading markers at line starts.
pub fn strip_headings(text: &str) -> Cow<'_, str> {
    HEADING.replace_all(text, "")
}

/// Convert bullet and numbered list markers to a uniform bullet glyph.
pub fn unify_list_markers(text: &str) -> String {
    let text = BULLET.replace_all(text, "• ");
    NUMBERED.replace_all(&text, "• ").into_owned()
}

/// Convert `[text](url)` links to bare text.
pub fn strip_links(text: &str) -> Cow<'_, str> {
    LINK.replace_all(text, "$1")
}

/// Collapse 3+ consecutive line breaks to exactly 2.
pub fn collapse_blank_lines(text: &str) -> Cow<'_, str> {
    EXCESS_NEWLINES.replace_all(text, "\n\n")
}

/// Rewrite a raw model reply into the plain-text form Zalo can render.
/// Pure and total; applying it twice gives the same result as once.
pub fn normalize(raw: &str) -> String {
    let text = strip_intro_preamble(raw);
    let text = strip_code_fences(text);
    let text = strip_inline_emphasis(&text);
    let text = strip_headings(&text);
    let text = unify_list_markers(&text);
    let text = strip_links(&text);
    let text = collapse_blank_lines(&text);
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_bold_and_code_span_keep_inner_text() {
        assert_eq!(normalize("**bold** and `code`"), "bold and code");
    }

    #[test]
    fn test_italic_markers_removed() {
        assert_eq!(normalize("an *italic* word"), "an italic word");
    }

    #[test]
    fn test_fenced_block_delimiters_removed_content_intact() {
        assert_eq!(normalize("```js\nconsole.log(1)\n```"), "console.log(1)");
    }

    #[test]
    fn test_fence_survives_inline_pass() {
        let input = indoc! {"
            Ví dụ:

            ```python
            x = `1`
            print(x)
            ```
        "};
        let output = normalize(input);
        assert!(output.contains("x = 1"));
        assert!(output.contains("print(x)"));
        assert!(!output.contains("```"));
    }

    #[test]
    fn test_headings_stripped_at_line_starts() {
        assert_eq!(normalize("# Tiêu đề\nnội dung"), "Tiêu đề\nnội dung");
        assert_eq!(normalize("### Sâu hơn"), "Sâu hơn");
    }

    #[test]
    fn test_list_markers_become_bullets() {
        let input = indoc! {"
            - một
            * hai
            1. ba
            2. bốn
        "};
        assert_eq!(normalize(input), "• một\n• hai\n• ba\n• bốn");
    }

    #[test]
    fn test_links_become_bare_text() {
        assert_eq!(
            normalize("xem [tài liệu](https://example.com) nhé"),
            "xem tài liệu nhé"
        );
    }

    #[test]
    fn test_excess_blank_lines_collapse_to_one() {
        assert_eq!(normalize("a\n\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_intro_preamble_stripped_only_at_start() {
        assert_eq!(
            normalize("Tôi là Gemini Bot. Kết quả là 4."),
            "Kết quả là 4."
        );
        // Mid-text occurrences stay.
        assert_eq!(
            normalize("Bạn hỏi ai? Tôi là Gemini Bot."),
            "Bạn hỏi ai? Tôi là Gemini Bot."
        );
    }

    #[test]
    fn test_stacked_preambles_all_stripped() {
        assert_eq!(
            normalize("Xin chào! Tôi là Gemini Bot. Là một trợ lý AI, tôi nghĩ đáp án là 4."),
            "tôi nghĩ đáp án là 4."
        );
    }

    #[test]
    fn test_idempotent_on_clean_text() {
        let clean = "Xin chào 👋\n\n• một\n• hai\n\nHết.";
        assert_eq!(normalize(clean), clean);
        assert_eq!(normalize(&normalize(clean)), normalize(clean));
    }

    #[test]
    fn test_idempotent_on_normalized_output() {
        let messy = indoc! {"
            **Chào** bạn!

            ## Danh sách
            - [một](https://a.vn)
            - `hai`



            xong
        "};
        let once = normalize(messy);
        assert_eq!(normalize(&once), once);
    }
}

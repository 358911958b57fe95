//! HTML-to-text conversion and plain-text cleanup.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<script.*?</script>").expect("valid regex"));
static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<style.*?</style>").expect("valid regex"));
static BR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?\s*>").expect("valid regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#([0-9]+);").expect("valid regex"));
static TEXT_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(nbsp|lt|gt);").expect("valid regex"));
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static HTML_BLANK_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));
static TEXT_BLANK_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{2,}").expect("valid regex"));

/// Convert HTML to plain text.
///
/// - Removes `<script>` and `<style>` blocks
/// - `<br>` becomes a line break, `</p>` a paragraph break
/// - Strips every remaining tag
/// - Decodes `&nbsp; &lt; &gt; &amp; &quot; &apos;` and numeric `&#NNN;`
/// - Collapses whitespace inside lines and keeps at most one blank line
pub fn html_to_text(html: &str) -> String {
    let text = SCRIPT_RE.replace_all(html, "");
    let text = STYLE_RE.replace_all(&text, "");
    let text = BR_RE.replace_all(&text, "\n");
    let text = text.replace("</p>", "\n\n");
    let text = TAG_RE.replace_all(&text, "");
    let text = decode_entities(&text);

    let lines: Vec<String> = text
        .split('\n')
        .map(|line| WHITESPACE_RE.replace_all(line, " ").trim().to_string())
        .collect();
    let joined = lines.join("\n");

    HTML_BLANK_RUN_RE
        .replace_all(&joined, "\n\n")
        .trim()
        .to_string()
}

/// Tidy `text/plain` content.
///
/// Decodes `&nbsp; &lt; &gt;`, trims every line and drops blank lines.
pub fn sanitize_text(text: &str) -> String {
    let text = TEXT_ENTITY_RE.replace_all(text, |caps: &Captures| named_entity(&caps[1]));
    let joined = text.split('\n').map(str::trim).collect::<Vec<_>>().join("\n");

    TEXT_BLANK_RUN_RE
        .replace_all(&joined, "\n")
        .trim()
        .to_string()
}

/// Named entities in decoding order. Each one is replaced across the whole
/// text before the next, so `&amp;quot;` ends up as `"` while `&amp;lt;`
/// stops at `&lt;`.
const HTML_ENTITIES: [(&str, &str); 7] = [
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&amp;", "&"),
    ("&quot;", "\""),
    ("&apos;", "'"),
    ("&#39;", "'"),
];

/// Decode the named entities this crate knows, then decimal `&#NNN;`.
///
/// Numeric references outside the Unicode range are left untouched.
pub fn decode_entities(text: &str) -> String {
    let named = HTML_ENTITIES
        .iter()
        .fold(text.to_string(), |acc, (entity, literal)| {
            acc.replace(entity, literal)
        });

    NUMERIC_ENTITY_RE
        .replace_all(&named, |caps: &Captures| {
            caps[1]
                .parse::<u32>()
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn named_entity(name: &str) -> &'static str {
    match name {
        "nbsp" => " ",
        "lt" => "<",
        "gt" => ">",
        _ => "",
    }
}

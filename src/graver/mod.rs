//! Inline backtick markup ("graves").
//!
//! `build_graves` splits a paragraph into plain text spans and typed
//! [`Grave`] tokens. Double backticks mark cross-module references; single
//! backticks are classified by the shape of their content.

mod literal;

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

pub use literal::{classify_literal, LiteralClass};

/// Characters of context shown on each side of a markup problem.
const CONTEXT_WINDOW: usize = 25;

/// Kind of an inline grave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GraveType {
    /// A builtin type or exception name such as `int`.
    Builtin,
    /// A Python literal such as `'abc'` or `(1, 2)`.
    Expression,
    /// A name relative to the documented object.
    LocalReference,
    /// A double-grave reference resolved through the unit graph.
    GlobalReference,
    /// Anything that is not a Python expression.
    Quote,
    /// `title:https://...`
    Link,
}

/// A classified inline span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grave {
    pub content: String,
    pub kind: GraveType,
}

impl Grave {
    pub fn new(content: impl Into<String>, kind: GraveType) -> Self {
        Self {
            content: content.into(),
            kind,
        }
    }

    /// Split a link grave into `(title, url)`.
    pub fn link_parts(&self) -> Option<(&str, &str)> {
        if self.kind != GraveType::Link {
            return None;
        }
        let captures = link_regex()?.captures(&self.content)?;
        Some((captures.get(1)?.as_str().trim(), captures.get(2)?.as_str()))
    }
}

/// One element of a graved text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum GravedSpan {
    Text(String),
    Grave(Grave),
}

impl GravedSpan {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            GravedSpan::Text(text) => Some(text),
            GravedSpan::Grave(_) => None,
        }
    }

    pub fn as_grave(&self) -> Option<&Grave> {
        match self {
            GravedSpan::Grave(grave) => Some(grave),
            GravedSpan::Text(_) => None,
        }
    }
}

/// A text converted to spans.
pub type GravedText = Vec<GravedSpan>;

const BUILTIN_TYPE_NAMES: &[&str] = &[
    "object", "type", "int", "float", "complex", "bool", "str", "bytes", "bytearray",
    "memoryview", "list", "tuple", "dict", "set", "frozenset", "range", "slice", "property",
    "staticmethod", "classmethod", "super", "NoneType", "Ellipsis", "NotImplemented",
    "BaseException", "Exception", "ArithmeticError", "AssertionError", "AttributeError",
    "ConnectionError", "EOFError", "ImportError", "IndexError", "KeyError", "LookupError",
    "MemoryError", "NotImplementedError", "OSError", "OverflowError", "PermissionError",
    "RecursionError", "RuntimeError", "StopAsyncIteration", "StopIteration", "SyntaxError",
    "SystemExit", "TimeoutError", "TypeError", "UnicodeDecodeError", "UnicodeEncodeError",
    "ValueError", "ZeroDivisionError", "KeyboardInterrupt", "GeneratorExit",
];

/// Whether `name` is one of the builtin type names graves highlight.
pub fn is_builtin_type_name(name: &str) -> bool {
    BUILTIN_TYPE_NAMES.contains(&name)
}

fn link_regex() -> Option<&'static Regex> {
    static LINK: OnceLock<Option<Regex>> = OnceLock::new();
    LINK.get_or_init(|| Regex::new(r"^(.+?):\s*(https?://\S+)$").ok())
        .as_ref()
}

/// Classify the content of a single-grave span.
pub fn classify_single_grave(content: &str) -> GraveType {
    if is_builtin_type_name(content) {
        return GraveType::Builtin;
    }
    if link_regex().is_some_and(|regex| regex.is_match(content)) {
        return GraveType::Link;
    }
    match classify_literal(content) {
        LiteralClass::Literal => GraveType::Expression,
        LiteralClass::NotLiteral => GraveType::LocalReference,
        LiteralClass::Invalid => GraveType::Quote,
    }
}

/// Whether a space goes between `before` and `piece` when joining spans.
pub fn needs_glue(before: &str, piece: &str) -> bool {
    !before.is_empty()
        && !before.ends_with(['(', '[', '{', '\n'])
        && !piece.starts_with(['.', ',', ':', ';', '!', '?', ')', ']', '}', '\''])
}

/// Tokenize `text` into plain spans and graves.
///
/// Never fails: malformed markup is kept as plain text and described in the
/// returned warning list.
pub fn build_graves(text: &str) -> (GravedText, Vec<String>) {
    let mut spans = GravedText::new();
    let mut warnings = Vec::new();
    let mut position = 0;

    loop {
        let Some(offset) = text[position..].find('`') else {
            push_text(&mut spans, &text[position..]);
            break;
        };
        let start = position + offset;

        if start + 1 == text.len() {
            warnings.push(format!(
                "Grave character at the end of text: {:?}",
                context(text, start)
            ));
            push_text(&mut spans, &text[position..]);
            break;
        }

        if text.as_bytes()[start + 1] == b'`' {
            let content_start = start + 2;
            let Some(end_offset) = text[content_start..].find("``") else {
                warnings.push(format!(
                    "Unclosed double grave starting at {}: {:?}",
                    start,
                    context(text, start)
                ));
                push_text(&mut spans, &text[position..]);
                break;
            };
            let end = content_start + end_offset;
            if end == content_start {
                warnings.push(format!(
                    "Empty double grave at {}: {:?}",
                    start,
                    context(text, start)
                ));
                push_text(&mut spans, &text[position..end + 2]);
                position = end + 2;
                continue;
            }
            push_text(&mut spans, &text[position..start]);
            spans.push(GravedSpan::Grave(Grave::new(
                &text[content_start..end],
                GraveType::GlobalReference,
            )));
            position = end + 2;
            continue;
        }

        let content_start = start + 1;
        let Some(end_offset) = text[content_start..].find('`') else {
            warnings.push(format!(
                "Unclosed grave starting at {}: {:?}",
                start,
                context(text, start)
            ));
            push_text(&mut spans, &text[position..]);
            break;
        };
        let end = content_start + end_offset;
        let content = &text[content_start..end];
        push_text(&mut spans, &text[position..start]);
        spans.push(GravedSpan::Grave(Grave::new(
            content,
            classify_single_grave(content),
        )));
        position = end + 1;
    }

    let spans = spans
        .into_iter()
        .filter_map(|span| match span {
            GravedSpan::Text(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| GravedSpan::Text(trimmed.to_string()))
            }
            grave => Some(grave),
        })
        .collect();

    (spans, warnings)
}

fn push_text(spans: &mut GravedText, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(GravedSpan::Text(last)) = spans.last_mut() {
        last.push_str(text);
    } else {
        spans.push(GravedSpan::Text(text.to_string()));
    }
}

fn context(text: &str, index: usize) -> &str {
    let mut start = index.saturating_sub(CONTEXT_WINDOW);
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (index + CONTEXT_WINDOW).min(text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }
    &text[start..end]
}

/// Join spans back into a single line of text, graves shown bare.
pub fn graved_to_plain(spans: &[GravedSpan]) -> String {
    let mut out = String::new();
    for span in spans {
        let piece = match span {
            GravedSpan::Text(text) => text.as_str(),
            GravedSpan::Grave(grave) => match grave.link_parts() {
                Some((title, _)) => title,
                None => grave.content.as_str(),
            },
        };
        push_joined(&mut out, piece);
    }
    out
}

/// Append `piece` to `out`, separated by a space unless punctuation follows.
pub fn push_joined(out: &mut String, piece: &str) {
    if needs_glue(out, piece) {
        out.push(' ');
    }
    out.push_str(piece);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graves(spans: &[GravedSpan]) -> Vec<&Grave> {
        spans.iter().filter_map(GravedSpan::as_grave).collect()
    }

    #[test]
    fn test_plain_text() {
        let (spans, warnings) = build_graves("  just words  ");
        assert_eq!(spans, vec![GravedSpan::Text("just words".into())]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_double_grave_is_global_reference() {
        let (spans, warnings) = build_graves("See ``Client.events`` for details.");
        assert!(warnings.is_empty());
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0], GravedSpan::Text("See".into()));
        assert_eq!(
            spans[1],
            GravedSpan::Grave(Grave::new("Client.events", GraveType::GlobalReference))
        );
        assert_eq!(spans[2], GravedSpan::Text("for details.".into()));
    }

    #[test]
    fn test_double_grave_content_not_reclassified() {
        let (spans, _) = build_graves("``int``");
        assert_eq!(graves(&spans)[0].kind, GraveType::GlobalReference);
    }

    #[test]
    fn test_single_grave_classification() {
        let (spans, warnings) =
            build_graves("`int` `'abc'` `guild.id` `some words` `Docs:https://example.com`");
        assert!(warnings.is_empty());
        let kinds: Vec<_> = graves(&spans).iter().map(|g| g.kind).collect();
        assert_eq!(
            kinds,
            [
                GraveType::Builtin,
                GraveType::Expression,
                GraveType::LocalReference,
                GraveType::Quote,
                GraveType::Link,
            ]
        );
    }

    #[test]
    fn test_link_parts() {
        let grave = Grave::new("Discord docs:https://discord.com/developers", GraveType::Link);
        assert_eq!(
            grave.link_parts(),
            Some(("Discord docs", "https://discord.com/developers"))
        );
    }

    #[test]
    fn test_unterminated_single_grave_warns() {
        let (spans, warnings) = build_graves("value is `broken here");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Unclosed grave"));
        assert_eq!(spans, vec![GravedSpan::Text("value is `broken here".into())]);
    }

    #[test]
    fn test_unterminated_double_grave_warns() {
        let (_, warnings) = build_graves("see ``Guild");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("double grave"));
    }

    #[test]
    fn test_grave_at_end_warns() {
        let (spans, warnings) = build_graves("trailing `");
        assert_eq!(warnings.len(), 1);
        assert_eq!(spans, vec![GravedSpan::Text("trailing `".into())]);
    }

    #[test]
    fn test_empty_double_grave_warns_and_continues() {
        let (spans, warnings) = build_graves("a ```` then `int`");
        assert_eq!(warnings.len(), 1);
        assert_eq!(graves(&spans)[0].kind, GraveType::Builtin);
    }

    #[test]
    fn test_graved_to_plain_glues_punctuation() {
        let (spans, _) = build_graves("Returns `int`, or ``None``.");
        assert_eq!(graved_to_plain(&spans), "Returns int, or None.");
    }
}

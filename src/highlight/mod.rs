//! Highlight Engine
//!
//! Turns a selection plus an optional token list into styled spans.
//! The same entry point serves the embedded agent and the injected
//! fallback script; both hand over the page's current selection, which
//! may be absent.

pub mod stylesheet;

use tracing::{debug, info, warn};

use crate::dom::{Document, DomError, NodeId, Range};
use crate::token::{Token, DEFAULT_CATEGORY};

/// Class carried by every highlight span
pub const MARKER_CLASS: &str = "kaku-yaku-highlight";

/// Prefix of the per-category class
pub const CATEGORY_CLASS_PREFIX: &str = "kaku-yaku-";

pub fn category_class(category: &str) -> String {
    format!("{CATEGORY_CLASS_PREFIX}{category}")
}

/// What a span should look like
#[derive(Debug, Clone)]
struct SpanStyle<'a> {
    category: &'static str,
    title: String,
    reading: Option<&'a str>,
    dictionary_form: Option<&'a str>,
}

impl<'a> SpanStyle<'a> {
    fn plain(text: &str) -> Self {
        Self {
            category: DEFAULT_CATEGORY,
            title: text.to_string(),
            reading: None,
            dictionary_form: None,
        }
    }

    fn for_token(token: &'a Token) -> Self {
        let category = token.category();
        Self {
            category,
            title: format!("{} ({})", token.surface, category),
            reading: token.reading.as_deref(),
            dictionary_form: token.dictionary_form.as_deref(),
        }
    }

    fn create(&self, doc: &mut Document) -> NodeId {
        let span = doc.create_element("span");
        doc.set_attribute(
            span,
            "class",
            &format!("{MARKER_CLASS} {}", category_class(self.category)),
        );
        doc.set_attribute(span, "title", &self.title);
        if let Some(reading) = self.reading {
            doc.set_attribute(span, "data-reading", reading);
        }
        if let Some(form) = self.dictionary_form {
            doc.set_attribute(span, "data-dictionary-form", form);
        }
        span
    }

    /// A detached span holding `text`
    fn build(&self, doc: &mut Document, text: &str) -> Result<NodeId, DomError> {
        let span = self.create(doc);
        let inner = doc.create_text(text);
        doc.append_child(span, inner)?;
        Ok(span)
    }
}

/// Highlight `text` in `doc`, returning the number of spans created.
///
/// With a live `selection` the selected contents are replaced in place:
/// one `default` span in plain mode, or one span per token. Without a
/// selection every rendered occurrence of the text (or of each token's
/// surface) is wrapped instead.
pub fn highlight(
    doc: &mut Document,
    selection: Option<Range>,
    text: &str,
    tokens: &[Token],
) -> usize {
    // tokens without a surface cannot reconstruct any text
    let tokens: Vec<&Token> = tokens.iter().filter(|t| !t.surface.is_empty()).collect();
    let token_mode = !tokens.is_empty();
    match (selection, token_mode) {
        (Some(range), false) => replace_with_plain(doc, range, text),
        (Some(range), true) => replace_with_tokens(doc, range, &tokens),
        (None, false) => wrap_occurrences(doc, text, &SpanStyle::plain(text)),
        (None, true) => {
            let total: usize = tokens
                .iter()
                .map(|token| wrap_occurrences(doc, &token.surface, &SpanStyle::for_token(token)))
                .sum();
            info!("Scanned page for {} tokens, {} spans", tokens.len(), total);
            total
        }
    }
}

fn replace_with_plain(doc: &mut Document, mut range: Range, text: &str) -> usize {
    let result = range.delete_contents(doc).and_then(|_| {
        let span = SpanStyle::plain(text).build(doc, text)?;
        range.insert_node(doc, span)
    });
    match result {
        Ok(()) => {
            debug!("Highlighted selection as a single span");
            1
        }
        Err(e) => {
            warn!("Failed to highlight selection: {}", e);
            0
        }
    }
}

fn replace_with_tokens(doc: &mut Document, mut range: Range, tokens: &[&Token]) -> usize {
    let result = range.delete_contents(doc).and_then(|_| {
        let fragment = doc.create_fragment();
        let mut created = 0;
        for &token in tokens {
            let span = SpanStyle::for_token(token).build(doc, &token.surface)?;
            doc.append_child(fragment, span)?;
            created += 1;
        }
        range.insert_node(doc, fragment)?;
        Ok(created)
    });
    match result {
        Ok(created) => {
            info!("Replaced selection with {} token spans", created);
            created
        }
        Err(e) => {
            warn!("Failed to highlight selection with tokens: {}", e);
            0
        }
    }
}

/// Wrap every non-overlapping occurrence of `needle` in rendered text
/// that is not already highlighted.
fn wrap_occurrences(doc: &mut Document, needle: &str, style: &SpanStyle<'_>) -> usize {
    if needle.is_empty() {
        return 0;
    }

    let candidates = doc.text_nodes_where(doc.root(), |d, n| d.has_class(n, MARKER_CLASS));
    let mut count = 0;

    for node in candidates {
        let mut current = node;
        let mut cursor = 0;
        loop {
            let found = doc
                .text(current)
                .and_then(|t| t.get(cursor..))
                .and_then(|t| t.find(needle))
                .map(|i| i + cursor);
            let Some(at) = found else { break };

            match surround(doc, current, at, at + needle.len(), style) {
                Ok(Some(rest)) => {
                    count += 1;
                    current = rest;
                    cursor = 0;
                }
                Ok(None) => {
                    count += 1;
                    break;
                }
                Err(e) => {
                    debug!("Skipping occurrence at byte {}: {}", at, e);
                    cursor = at + needle.len();
                }
            }
        }
    }
    count
}

/// Move `start..end` of a text node into a new span. Returns the text node
/// holding whatever followed the match, if anything did.
fn surround(
    doc: &mut Document,
    node: NodeId,
    start: usize,
    end: usize,
    style: &SpanStyle<'_>,
) -> Result<Option<NodeId>, DomError> {
    let parent = doc.parent(node).ok_or(DomError::HierarchyRequest)?;
    let len = doc.text(node).map(str::len).unwrap_or_default();

    let matched = if start == 0 {
        node
    } else {
        doc.split_text(node, start)?
    };
    let rest = if end < len {
        Some(doc.split_text(matched, end - start)?)
    } else {
        None
    };

    let span = style.create(doc);
    doc.insert_before(parent, span, Some(matched))?;
    doc.append_child(span, matched)?;
    Ok(rest)
}

/// Highlight spans currently in the document
pub fn count_spans(doc: &Document) -> usize {
    doc.elements_with_class(doc.root(), MARKER_CLASS).len()
}

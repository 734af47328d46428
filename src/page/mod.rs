//! Page Context
//!
//! State owned by one page: its document, the live selection, the
//! page-scoped agent flag, and anything injected into it.

pub mod agent;

use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

use crate::dom::{Document, Range};
use crate::error::{KakuError, KakuResult};
use crate::highlight;
use crate::protocol::InjectedScript;
use crate::token::{preview, Token};

pub use agent::{AgentState, EmbeddedAgent};

/// Read a page from a text file, one paragraph per non-blank line
pub fn read_document(path: &Path) -> KakuResult<Document> {
    let content = std::fs::read_to_string(path)?;
    let lines = content.lines().map(str::trim).filter(|l| !l.is_empty());
    Ok(Document::from_paragraphs(lines))
}

#[derive(Debug)]
pub struct Page {
    url: String,
    document: Document,
    selection: Option<Range>,
    agent_loaded: bool,
    stylesheets: Vec<String>,
    notices: Vec<String>,
}

impl Page {
    pub fn new(url: &str, document: Document) -> Self {
        Self {
            url: url.to_string(),
            document,
            selection: None,
            agent_loaded: false,
            stylesheets: Vec::new(),
            notices: Vec::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn stylesheets(&self) -> &[String] {
        &self.stylesheets
    }

    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    pub fn agent_loaded(&self) -> bool {
        self.agent_loaded
    }

    /// Set the page-scoped agent flag; false if it was already set
    pub fn mark_agent_loaded(&mut self) -> bool {
        !std::mem::replace(&mut self.agent_loaded, true)
    }

    /// Select the first rendered occurrence of `needle`
    pub fn select_text(&mut self, needle: &str) -> bool {
        if needle.is_empty() {
            return false;
        }
        let doc = &self.document;
        let range = doc
            .text_nodes_where(doc.root(), |_, _| false)
            .into_iter()
            .find_map(|node| {
                let at = doc.text(node)?.find(needle)?;
                Range::within_text(doc, node, at, at + needle.len()).ok()
            });
        self.selection = range;
        self.selection.is_some()
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Text of the live selection, if any and non-empty
    pub fn selected_text(&self) -> Option<String> {
        self.selection
            .as_ref()
            .and_then(|r| r.text(&self.document).ok())
            .filter(|t| !t.is_empty())
    }

    /// Run the highlight engine against the live selection, consuming it
    pub fn highlight(&mut self, text: &str, tokens: &[Token]) -> usize {
        let selection = self.selection.take();
        debug!(
            "Highlighting \"{}\" on {} ({} tokens, selection: {})",
            preview(text),
            self.url,
            tokens.len(),
            selection.is_some()
        );
        highlight::highlight(&mut self.document, selection, text, tokens)
    }

    pub fn insert_css(&mut self, css: &str) {
        self.stylesheets.push(css.to_string());
    }

    /// Execute an injected script, returning its JSON result
    pub fn execute(&mut self, script: Value) -> KakuResult<Value> {
        let script: InjectedScript = serde_json::from_value(script)
            .map_err(|e| KakuError::Injection(format!("unrecognized script: {e}")))?;

        match script {
            InjectedScript::HighlightText { text, tokens } => {
                let count = self.highlight(&text, &tokens);
                info!("Injected highlight produced {} spans on {}", count, self.url);
                Ok(Value::from(count))
            }
            InjectedScript::Alert { message } => {
                info!("🔔 Notice on {}: {}", self.url, message);
                self.notices.push(message);
                Ok(Value::Null)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encode;

    #[test]
    fn test_select_and_read_back() {
        let mut page = Page::new("https://example.jp/", Document::from_paragraphs(["今日は京都"]));
        assert!(page.select_text("京都"));
        assert_eq!(page.selected_text().as_deref(), Some("京都"));
        assert!(!page.select_text("大阪"));
        assert_eq!(page.selected_text(), None);
    }

    #[test]
    fn test_read_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.txt");
        std::fs::write(&path, "猫が歩く\n\n  犬が走る  \n").unwrap();

        let doc = read_document(&path).unwrap();
        assert_eq!(doc.to_html(), "<html><body><p>猫が歩く</p><p>犬が走る</p></body></html>");

        assert!(matches!(
            read_document(&dir.path().join("missing.txt")),
            Err(KakuError::Io(_))
        ));
    }

    #[test]
    fn test_agent_flag_set_once() {
        let mut page = Page::new("about:blank", Document::new());
        assert!(page.mark_agent_loaded());
        assert!(!page.mark_agent_loaded());
        assert!(page.agent_loaded());
    }

    #[test]
    fn test_highlight_consumes_selection() {
        let mut page = Page::new("about:blank", Document::from_paragraphs(["京都と京都"]));
        page.select_text("京都");
        assert_eq!(page.highlight("京都", &[]), 1);
        assert_eq!(page.selected_text(), None);
        // without a selection the remaining occurrence is found by scanning
        assert_eq!(page.highlight("京都", &[]), 1);
        assert_eq!(highlight::count_spans(page.document()), 2);
    }

    #[test]
    fn test_execute_scripts() {
        let mut page = Page::new("about:blank", Document::from_paragraphs(["猫が歩く"]));
        let script = encode(&InjectedScript::HighlightText {
            text: "猫".to_string(),
            tokens: Vec::new(),
        })
        .unwrap();
        assert_eq!(page.execute(script).unwrap(), Value::from(1));

        let alert = encode(&InjectedScript::Alert {
            message: "nope".to_string(),
        })
        .unwrap();
        assert_eq!(page.execute(alert).unwrap(), Value::Null);
        assert_eq!(page.notices(), ["nope".to_string()]);

        assert!(matches!(
            page.execute(serde_json::json!({"func": "eval"})),
            Err(KakuError::Injection(_))
        ));
    }
}

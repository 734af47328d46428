//! Host Platform Boundary
//!
//! The privileged capabilities the background process relies on, and the
//! events the host delivers to it. Page contexts share no memory with the
//! privileged side; every exchange is a serialized JSON value.

pub mod tabs;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::error::{KakuError, KakuResult};
use crate::protocol::{encode, InjectedScript, RuntimeMessage};

pub use tabs::{PageSnapshot, TabHost};

/// Identifier of one page context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextId(pub u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab {}", self.0)
    }
}

/// Menu entry id used for highlight activations
pub const MENU_ITEM_ID: &str = "analyze-japanese-text";

/// A context-menu entry registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub id: String,
    pub title: String,
    pub contexts: Vec<String>,
}

impl MenuEntry {
    /// The single entry this extension registers, shown only over a selection
    pub fn analyze_selection() -> Self {
        Self {
            id: MENU_ITEM_ID.to_string(),
            title: "解析日本語".to_string(),
            contexts: vec!["selection".to_string()],
        }
    }
}

/// A context-menu activation as reported by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuClick {
    pub menu_item_id: String,
    pub selection_text: Option<String>,
}

/// Events the host delivers to the privileged process
#[derive(Debug, Clone)]
pub enum HostEvent {
    /// A page context sent a runtime message
    Runtime { sender: ContextId, message: Value },
    /// A page context was closed or navigated away
    ContextDestroyed(ContextId),
    /// The user activated a context-menu entry
    MenuClicked {
        context: Option<ContextId>,
        click: MenuClick,
    },
}

/// Privileged operations against page contexts
#[async_trait]
pub trait PageHost: Send + Sync {
    /// Deliver a message to the agent in `context`, resolving with its reply
    async fn send_message(&self, context: ContextId, message: Value) -> KakuResult<Option<Value>>;

    /// Add a stylesheet to the page
    async fn insert_css(&self, context: ContextId, css: &str) -> KakuResult<()>;

    /// Run a self-contained script in the page and return its result
    async fn execute_script(&self, context: ContextId, script: InjectedScript)
        -> KakuResult<Value>;
}

/// A page context's one-way channel to the privileged process
#[derive(Debug, Clone)]
pub struct RuntimePort {
    context: ContextId,
    tx: mpsc::UnboundedSender<HostEvent>,
}

impl RuntimePort {
    pub fn new(context: ContextId, tx: mpsc::UnboundedSender<HostEvent>) -> Self {
        Self { context, tx }
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Fire-and-forget post
    pub fn post(&self, message: &RuntimeMessage) -> KakuResult<()> {
        let message = encode(message)?;
        self.tx
            .send(HostEvent::Runtime {
                sender: self.context,
                message,
            })
            .map_err(|_| KakuError::Delivery("privileged process is gone".to_string()))?;
        debug!("📨 {} posted runtime message", self.context);
        Ok(())
    }

    /// Post, logging instead of failing
    pub fn post_or_log(&self, message: &RuntimeMessage) {
        if let Err(e) = self.post(message) {
            error!("Failed to post runtime message from {}: {}", self.context, e);
        }
    }
}

//! Embedded Agent
//!
//! Script instance living inside a page. It announces itself once per page
//! load, answers liveness probes, and executes highlight instructions.

use serde_json::Value;
use tracing::{debug, info};

use super::Page;
use crate::host::RuntimePort;
use crate::protocol::{encode, RuntimeMessage, TabMessage, TabReply};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Uninitialized,
    Ready,
}

#[derive(Debug)]
pub struct EmbeddedAgent {
    state: AgentState,
    port: RuntimePort,
}

impl EmbeddedAgent {
    pub fn new(port: RuntimePort) -> Self {
        Self {
            state: AgentState::Uninitialized,
            port,
        }
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    /// Initialize on `page`. Returns false when this page already hosts an
    /// initialized agent, in which case this instance stays inert.
    pub fn start(&mut self, page: &mut Page) -> bool {
        if self.state == AgentState::Ready {
            return false;
        }
        if !page.mark_agent_loaded() {
            debug!("Agent already initialized on {}", page.url());
            return false;
        }

        self.state = AgentState::Ready;
        info!("Agent ready on {} ({})", page.url(), self.port.context());
        self.port.post_or_log(&RuntimeMessage::ContentScriptReady {
            url: page.url().to_string(),
        });
        true
    }

    /// Handle an inbound message. `None` means nobody is listening.
    pub fn on_message(&mut self, page: &mut Page, message: Value) -> Option<Value> {
        if self.state != AgentState::Ready {
            return None;
        }

        match serde_json::from_value::<TabMessage>(message) {
            Ok(TabMessage::Ping) => Some(encode(&TabReply::Pong).unwrap_or_default()),
            Ok(TabMessage::HighlightText { text, tokens }) => {
                if !text.is_empty() {
                    let tokens = tokens.unwrap_or_default();
                    let count = page.highlight(&text, &tokens);
                    debug!("Agent created {} spans", count);
                }
                Some(Value::Bool(true))
            }
            Err(_) => {
                debug!("Ignoring unrecognized message");
                Some(Value::Bool(true))
            }
        }
    }
}

//! Mock Page Host for Testing
//!
//! Records every privileged operation so tests can assert on which
//! delivery path an activation took.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use kakuyaku::error::{KakuError, KakuResult};
use kakuyaku::host::{ContextId, PageHost};
use kakuyaku::protocol::InjectedScript;

/// How the mock's page reacts to messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentMode {
    /// No agent: delivery fails
    Absent,
    /// Agent answers probes and accepts instructions
    Ready,
    /// Agent never answers a probe
    Unresponsive,
    /// Agent answers probes but rejects the highlight instruction
    DropsInstructions,
}

#[derive(Debug)]
pub struct MockHost {
    agent: AgentMode,
    /// Count the injected highlight script evaluates to
    fallback_spans: u64,
    /// Fail every injection
    fail_injection: bool,
    /// Non-probe messages delivered to an agent
    pub messages: Arc<Mutex<Vec<(ContextId, Value)>>>,
    pub probes: Arc<Mutex<usize>>,
    pub stylesheets: Arc<Mutex<Vec<String>>>,
    pub scripts: Arc<Mutex<Vec<InjectedScript>>>,
}

impl MockHost {
    pub fn new(agent: AgentMode) -> Self {
        Self {
            agent,
            fallback_spans: 0,
            fail_injection: false,
            messages: Arc::new(Mutex::new(Vec::new())),
            probes: Arc::new(Mutex::new(0)),
            stylesheets: Arc::new(Mutex::new(Vec::new())),
            scripts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_fallback_spans(mut self, spans: u64) -> Self {
        self.fallback_spans = spans;
        self
    }

    pub fn failing_injection(mut self) -> Self {
        self.fail_injection = true;
        self
    }

    pub fn get_messages(&self) -> Vec<Value> {
        self.messages.lock().unwrap().iter().map(|(_, m)| m.clone()).collect()
    }

    pub fn get_scripts(&self) -> Vec<InjectedScript> {
        self.scripts.lock().unwrap().clone()
    }

    pub fn probe_count(&self) -> usize {
        *self.probes.lock().unwrap()
    }

    /// Injected highlight scripts, excluding notices
    pub fn highlight_scripts(&self) -> Vec<InjectedScript> {
        self.get_scripts()
            .into_iter()
            .filter(|s| matches!(s, InjectedScript::HighlightText { .. }))
            .collect()
    }

    /// Messages of failure notices shown
    pub fn notices(&self) -> Vec<String> {
        self.get_scripts()
            .into_iter()
            .filter_map(|s| match s {
                InjectedScript::Alert { message } => Some(message),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl PageHost for MockHost {
    async fn send_message(&self, context: ContextId, message: Value) -> KakuResult<Option<Value>> {
        let is_probe = message["action"] == "ping";
        if is_probe {
            *self.probes.lock().unwrap() += 1;
        }

        match self.agent {
            AgentMode::Absent => Err(KakuError::Delivery(
                "Mock: receiving end does not exist".to_string(),
            )),
            AgentMode::Unresponsive => std::future::pending().await,
            AgentMode::DropsInstructions if !is_probe => Err(KakuError::Delivery(
                "Mock: message port closed".to_string(),
            )),
            AgentMode::Ready | AgentMode::DropsInstructions => {
                if is_probe {
                    return Ok(Some(json!({"action": "pong"})));
                }
                self.messages.lock().unwrap().push((context, message));
                Ok(Some(json!(true)))
            }
        }
    }

    async fn insert_css(&self, _: ContextId, css: &str) -> KakuResult<()> {
        if self.fail_injection {
            return Err(KakuError::Injection("Mock: cannot access page".to_string()));
        }
        self.stylesheets.lock().unwrap().push(css.to_string());
        Ok(())
    }

    async fn execute_script(&self, _: ContextId, script: InjectedScript) -> KakuResult<Value> {
        let result = match &script {
            InjectedScript::HighlightText { .. } if self.fail_injection => {
                return Err(KakuError::Injection("Mock: cannot access page".to_string()));
            }
            InjectedScript::HighlightText { .. } => json!(self.fallback_spans),
            InjectedScript::Alert { .. } => Value::Null,
        };
        self.scripts.lock().unwrap().push(script);
        Ok(result)
    }
}

//! Selection Trigger
//!
//! Sequences one context-menu activation: analyze, pick a delivery path,
//! and report failure to the user once both paths are exhausted.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::fallback::FallbackInjector;
use super::readiness::ReadinessTracker;
use crate::analysis::Analyzer;
use crate::error::KakuResult;
use crate::host::{ContextId, MenuClick, PageHost, MENU_ITEM_ID};
use crate::protocol::{encode, InjectedScript, TabMessage};
use crate::token::{preview, Token};

/// How an activation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Guard rejected the click; nothing happened
    Ignored,
    /// Instruction accepted by the page's agent
    SentToAgent,
    /// Fallback injection produced spans
    Injected { spans: usize },
    /// Both paths came up empty and the user was told
    NoticeShown,
    /// Both paths came up empty and the notice itself failed
    Failed,
}

pub struct SelectionTrigger {
    analyzer: Arc<dyn Analyzer>,
    tracker: Arc<ReadinessTracker>,
    injector: FallbackInjector,
    host: Arc<dyn PageHost>,
    notice: String,
}

impl SelectionTrigger {
    pub fn new(
        analyzer: Arc<dyn Analyzer>,
        tracker: Arc<ReadinessTracker>,
        host: Arc<dyn PageHost>,
        notice: impl Into<String>,
    ) -> Self {
        Self {
            analyzer,
            tracker,
            injector: FallbackInjector::new(host.clone()),
            host,
            notice: notice.into(),
        }
    }

    /// Handle one activation. Never fails; every error degrades.
    pub async fn activate(&self, click: &MenuClick, context: Option<ContextId>) -> TriggerOutcome {
        if click.menu_item_id != MENU_ITEM_ID {
            debug!("Ignoring menu item {}", click.menu_item_id);
            return TriggerOutcome::Ignored;
        }
        let Some(text) = click.selection_text.as_deref().filter(|t| !t.is_empty()) else {
            debug!("Ignoring activation without a selection");
            return TriggerOutcome::Ignored;
        };
        let Some(context) = context else {
            debug!("Ignoring activation without a target context");
            return TriggerOutcome::Ignored;
        };

        info!("🖱️ Highlight requested in {}: \"{}\"", context, preview(text));

        let tokens = match self.analyzer.analyze(text).await {
            Ok(tokens) => {
                info!("🔤 Analysis returned {} tokens", tokens.len());
                tokens
            }
            Err(e) => {
                warn!("Analysis failed, highlighting without tokens: {}", e);
                Vec::new()
            }
        };

        if self.tracker.is_ready(context).await {
            match self.send_to_agent(context, text, &tokens).await {
                Ok(()) => {
                    info!("📨 Highlight instruction delivered to {}", context);
                    return TriggerOutcome::SentToAgent;
                }
                Err(e) => warn!("Agent in {} unreachable, falling back: {}", context, e),
            }
        }

        match self.injector.inject(context, text, &tokens).await {
            Ok(spans) if spans > 0 => return TriggerOutcome::Injected { spans },
            Ok(_) => warn!("Fallback found nothing to highlight in {}", context),
            Err(e) => warn!("Fallback injection into {} failed: {}", context, e),
        }

        self.show_notice(context).await
    }

    async fn send_to_agent(&self, context: ContextId, text: &str, tokens: &[Token]) -> KakuResult<()> {
        let message = encode(&TabMessage::HighlightText {
            text: text.to_string(),
            tokens: Some(tokens.to_vec()),
        })?;
        self.host.send_message(context, message).await?;
        Ok(())
    }

    async fn show_notice(&self, context: ContextId) -> TriggerOutcome {
        let script = InjectedScript::Alert {
            message: self.notice.clone(),
        };
        match self.host.execute_script(context, script).await {
            Ok(_) => TriggerOutcome::NoticeShown,
            Err(e) => {
                error!("Could not show failure notice in {}: {}", context, e);
                TriggerOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KakuError;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use std::time::Duration;

    struct FixedAnalyzer(Option<Vec<Token>>);

    #[async_trait]
    impl Analyzer for FixedAnalyzer {
        async fn analyze(&self, _: &str) -> KakuResult<Vec<Token>> {
            self.0
                .clone()
                .ok_or_else(|| KakuError::Network("connection refused".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingHost {
        agent: bool,
        spans: u64,
        messages: Mutex<Vec<Value>>,
        scripts: Mutex<Vec<InjectedScript>>,
    }

    #[async_trait]
    impl PageHost for RecordingHost {
        async fn send_message(&self, _: ContextId, message: Value) -> KakuResult<Option<Value>> {
            if !self.agent {
                return Err(KakuError::Delivery("receiving end does not exist".to_string()));
            }
            let reply = if message["action"] == "ping" {
                json!({"action": "pong"})
            } else {
                json!(true)
            };
            self.messages.lock().unwrap().push(message);
            Ok(Some(reply))
        }

        async fn insert_css(&self, _: ContextId, _: &str) -> KakuResult<()> {
            Ok(())
        }

        async fn execute_script(&self, _: ContextId, script: InjectedScript) -> KakuResult<Value> {
            let result = match &script {
                InjectedScript::HighlightText { .. } => json!(self.spans),
                InjectedScript::Alert { .. } => Value::Null,
            };
            self.scripts.lock().unwrap().push(script);
            Ok(result)
        }
    }

    fn trigger(host: &Arc<RecordingHost>, tokens: Option<Vec<Token>>) -> SelectionTrigger {
        let tracker = Arc::new(ReadinessTracker::new(host.clone(), Duration::from_millis(50)));
        SelectionTrigger::new(Arc::new(FixedAnalyzer(tokens)), tracker, host.clone(), "failed")
    }

    fn click(text: Option<&str>) -> MenuClick {
        MenuClick {
            menu_item_id: MENU_ITEM_ID.to_string(),
            selection_text: text.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_guard() {
        let host = Arc::new(RecordingHost::default());
        let trigger = trigger(&host, Some(Vec::new()));

        let other = MenuClick {
            menu_item_id: "open-settings".to_string(),
            selection_text: Some("東京".to_string()),
        };
        assert_eq!(trigger.activate(&other, Some(ContextId(1))).await, TriggerOutcome::Ignored);
        assert_eq!(trigger.activate(&click(Some("")), Some(ContextId(1))).await, TriggerOutcome::Ignored);
        assert_eq!(trigger.activate(&click(None), Some(ContextId(1))).await, TriggerOutcome::Ignored);
        assert_eq!(trigger.activate(&click(Some("東京")), None).await, TriggerOutcome::Ignored);
        assert!(host.scripts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ready_agent_gets_tokens() {
        let host = Arc::new(RecordingHost {
            agent: true,
            ..Default::default()
        });
        let trigger = trigger(&host, Some(vec![Token::new("東京", "名詞")]));

        let outcome = trigger.activate(&click(Some("東京")), Some(ContextId(2))).await;
        assert_eq!(outcome, TriggerOutcome::SentToAgent);

        let messages = host.messages.lock().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], json!({"action": "ping"}));
        assert_eq!(
            messages[1],
            json!({"action": "highlight-text", "text": "東京", "tokens": [{"surface": "東京", "pos": "名詞"}]})
        );
        assert!(host.scripts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_analysis_failure_degrades_to_empty_tokens() {
        let host = Arc::new(RecordingHost {
            spans: 2,
            ..Default::default()
        });
        let trigger = trigger(&host, None);

        let outcome = trigger.activate(&click(Some("京都")), Some(ContextId(3))).await;
        assert_eq!(outcome, TriggerOutcome::Injected { spans: 2 });
        assert_eq!(
            *host.scripts.lock().unwrap(),
            [InjectedScript::HighlightText {
                text: "京都".to_string(),
                tokens: Vec::new()
            }]
        );
    }

    #[tokio::test]
    async fn test_zero_spans_shows_one_notice() {
        let host = Arc::new(RecordingHost::default());
        let trigger = trigger(&host, Some(Vec::new()));

        let outcome = trigger.activate(&click(Some("大阪")), Some(ContextId(4))).await;
        assert_eq!(outcome, TriggerOutcome::NoticeShown);

        let scripts = host.scripts.lock().unwrap();
        let notices: Vec<_> = scripts
            .iter()
            .filter(|s| matches!(s, InjectedScript::Alert { .. }))
            .collect();
        assert_eq!(notices.len(), 1);
        assert_eq!(
            notices[0],
            &InjectedScript::Alert {
                message: "failed".to_string()
            }
        );
    }
}

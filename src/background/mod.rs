//! Privileged Background Process
//!
//! Consumes host events: readiness announcements feed the tracker,
//! destroyed contexts are evicted, and menu clicks start a trigger run.

pub mod fallback;
pub mod readiness;
pub mod trigger;

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::analysis::Analyzer;
use crate::config::Config;
use crate::host::{HostEvent, PageHost};
use crate::protocol::RuntimeMessage;

pub use fallback::FallbackInjector;
pub use readiness::ReadinessTracker;
pub use trigger::{SelectionTrigger, TriggerOutcome};

#[derive(Clone)]
pub struct Background {
    tracker: Arc<ReadinessTracker>,
    trigger: Arc<SelectionTrigger>,
}

impl Background {
    pub fn new(config: &Config, host: Arc<dyn PageHost>, analyzer: Arc<dyn Analyzer>) -> Self {
        let tracker = Arc::new(ReadinessTracker::new(host.clone(), config.probe_timeout()));
        let trigger = Arc::new(SelectionTrigger::new(
            analyzer,
            tracker.clone(),
            host,
            config.failure_notice.clone(),
        ));
        Self { tracker, trigger }
    }

    pub fn tracker(&self) -> &Arc<ReadinessTracker> {
        &self.tracker
    }

    /// Handle one event. Menu clicks run on their own task; activations
    /// are not serialized against each other.
    pub fn dispatch(&self, event: HostEvent) -> Option<JoinHandle<TriggerOutcome>> {
        match event {
            HostEvent::Runtime { sender, message } => {
                match serde_json::from_value::<RuntimeMessage>(message) {
                    Ok(RuntimeMessage::ContentScriptReady { url }) => {
                        debug!("Agent announced from {} ({})", sender, url);
                        self.tracker.mark_ready(sender);
                    }
                    Err(e) => debug!("Ignoring runtime message from {}: {}", sender, e),
                }
                None
            }
            HostEvent::ContextDestroyed(context) => {
                self.tracker.forget(context);
                None
            }
            HostEvent::MenuClicked { context, click } => {
                let trigger = self.trigger.clone();
                Some(tokio::spawn(async move { trigger.activate(&click, context).await }))
            }
        }
    }

    /// Drain the host's event stream until it closes
    pub async fn run(self, mut rx: mpsc::UnboundedReceiver<HostEvent>) {
        info!("🚀 Background process listening");
        while let Some(event) = rx.recv().await {
            self.dispatch(event);
        }
        info!("Host event stream closed");
    }
}

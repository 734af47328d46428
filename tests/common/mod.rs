pub mod mock_analyzer;
pub mod mock_host;

use std::sync::Arc;
use tokio::sync::mpsc;

use kakuyaku::analysis::Analyzer;
use kakuyaku::background::{Background, TriggerOutcome};
use kakuyaku::config::Config;
use kakuyaku::host::{ContextId, HostEvent, MenuClick, PageHost, MENU_ITEM_ID};

/// Config with a short probe bound so unanswered probes don't slow tests
pub fn test_config() -> Config {
    Config {
        probe_timeout_ms: 50,
        failure_notice: "highlight failed".to_string(),
        ..Config::default()
    }
}

pub fn background(host: Arc<dyn PageHost>, analyzer: Arc<dyn Analyzer>) -> Background {
    Background::new(&test_config(), host, analyzer)
}

/// A click on the highlight entry over `text`
pub fn menu_click(text: &str) -> MenuClick {
    MenuClick {
        menu_item_id: MENU_ITEM_ID.to_string(),
        selection_text: Some(text.to_string()),
    }
}

/// Run a single activation directly through the dispatcher
pub async fn activate(background: &Background, context: ContextId, text: &str) -> TriggerOutcome {
    let handle = background
        .dispatch(HostEvent::MenuClicked {
            context: Some(context),
            click: menu_click(text),
        })
        .expect("menu clicks start an activation");
    handle.await.expect("activation task panicked")
}

/// Feed host events to the dispatcher until the first activation finishes
pub async fn drive(
    background: &Background,
    events: &mut mpsc::UnboundedReceiver<HostEvent>,
) -> TriggerOutcome {
    while let Some(event) = events.recv().await {
        if let Some(handle) = background.dispatch(event) {
            return handle.await.expect("activation task panicked");
        }
    }
    panic!("event stream closed before any activation");
}

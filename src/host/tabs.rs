//! In-Process Tab Host
//!
//! Runs every page context as its own tokio task. The privileged side only
//! holds a command channel per tab; page state never leaves the task.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::{ContextId, HostEvent, MenuClick, MenuEntry, PageHost, RuntimePort};
use crate::dom::Document;
use crate::error::{KakuError, KakuResult};
use crate::highlight::count_spans;
use crate::page::{EmbeddedAgent, Page};
use crate::protocol::{encode, InjectedScript};

/// Read-only view of a page, for inspection
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub url: String,
    pub html: String,
    pub text: String,
    pub spans: usize,
    pub stylesheets: Vec<String>,
    pub notices: Vec<String>,
    pub agent_loaded: bool,
}

enum TabCommand {
    Deliver {
        message: Value,
        reply: oneshot::Sender<Option<Value>>,
    },
    InsertCss {
        css: String,
        reply: oneshot::Sender<()>,
    },
    Execute {
        script: Value,
        reply: oneshot::Sender<KakuResult<Value>>,
    },
    LoadAgent {
        reply: oneshot::Sender<bool>,
    },
    Select {
        text: String,
        reply: oneshot::Sender<bool>,
    },
    ClearSelection,
    SelectionText {
        reply: oneshot::Sender<Option<String>>,
    },
    Snapshot {
        reply: oneshot::Sender<PageSnapshot>,
    },
    Close,
}

/// Host that owns a set of tab tasks
pub struct TabHost {
    tabs: Mutex<HashMap<ContextId, mpsc::UnboundedSender<TabCommand>>>,
    next_id: AtomicU64,
    events: mpsc::UnboundedSender<HostEvent>,
    menu: MenuEntry,
}

impl TabHost {
    /// Create a host and the event stream the privileged process consumes
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HostEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let host = Self {
            tabs: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            events,
            menu: MenuEntry::analyze_selection(),
        };
        (host, rx)
    }

    /// The registered context-menu entry
    pub fn menu(&self) -> &MenuEntry {
        &self.menu
    }

    /// Open a page in a new tab. Must be called inside a tokio runtime.
    pub fn open(&self, url: &str, document: Document) -> ContextId {
        let context = ContextId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = mpsc::unbounded_channel();
        let page = Page::new(url, document);
        let port = RuntimePort::new(context, self.events.clone());

        tokio::spawn(run_tab(context, page, port, rx));
        self.tabs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(context, tx);
        info!("🗂️ Opened {} at {}", context, url);
        context
    }

    /// Close a tab and report it destroyed
    pub fn close(&self, context: ContextId) {
        let removed = self
            .tabs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&context);
        if let Some(tx) = removed {
            let _ = tx.send(TabCommand::Close);
            let _ = self.events.send(HostEvent::ContextDestroyed(context));
            info!("🗂️ Closed {}", context);
        }
    }

    /// Run the agent script in a tab. False if the page already had one.
    pub async fn load_agent(&self, context: ContextId) -> KakuResult<bool> {
        self.request(context, |reply| TabCommand::LoadAgent { reply })
            .await
    }

    /// Select the first occurrence of `text` in the tab
    pub async fn select(&self, context: ContextId, text: &str) -> KakuResult<bool> {
        let text = text.to_string();
        self.request(context, |reply| TabCommand::Select { text, reply })
            .await
    }

    pub fn clear_selection(&self, context: ContextId) -> KakuResult<()> {
        self.sender(context)?
            .send(TabCommand::ClearSelection)
            .map_err(|_| closed(context))
    }

    /// Activate the context-menu entry. The entry only exists while the
    /// tab has a selection; returns whether the click happened.
    pub async fn click_menu(&self, context: ContextId) -> KakuResult<bool> {
        let selection = self
            .request(context, |reply| TabCommand::SelectionText { reply })
            .await?;
        let Some(selection_text) = selection else {
            debug!("Menu entry disabled on {}: no selection", context);
            return Ok(false);
        };

        let click = MenuClick {
            menu_item_id: self.menu.id.clone(),
            selection_text: Some(selection_text),
        };
        self.events
            .send(HostEvent::MenuClicked {
                context: Some(context),
                click,
            })
            .map_err(|_| KakuError::Delivery("privileged process is gone".to_string()))?;
        Ok(true)
    }

    pub async fn snapshot(&self, context: ContextId) -> KakuResult<PageSnapshot> {
        self.request(context, |reply| TabCommand::Snapshot { reply })
            .await
    }

    fn sender(&self, context: ContextId) -> KakuResult<mpsc::UnboundedSender<TabCommand>> {
        self.tabs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&context)
            .cloned()
            .ok_or_else(|| closed(context))
    }

    async fn request<T>(
        &self,
        context: ContextId,
        build: impl FnOnce(oneshot::Sender<T>) -> TabCommand,
    ) -> KakuResult<T> {
        let (reply, rx) = oneshot::channel();
        self.sender(context)?
            .send(build(reply))
            .map_err(|_| closed(context))?;
        rx.await.map_err(|_| closed(context))
    }
}

fn closed(context: ContextId) -> KakuError {
    KakuError::Delivery(format!("no such tab: {}", context))
}

fn injection(err: KakuError) -> KakuError {
    match err {
        KakuError::Delivery(msg) => KakuError::Injection(msg),
        other => other,
    }
}

#[async_trait]
impl PageHost for TabHost {
    async fn send_message(&self, context: ContextId, message: Value) -> KakuResult<Option<Value>> {
        let reply = self
            .request(context, |reply| TabCommand::Deliver { message, reply })
            .await?;
        match reply {
            Some(value) => Ok(Some(value)),
            None => Err(KakuError::Delivery(format!(
                "receiving end does not exist in {}",
                context
            ))),
        }
    }

    async fn insert_css(&self, context: ContextId, css: &str) -> KakuResult<()> {
        let css = css.to_string();
        self.request(context, |reply| TabCommand::InsertCss { css, reply })
            .await
            .map_err(injection)
    }

    async fn execute_script(
        &self,
        context: ContextId,
        script: InjectedScript,
    ) -> KakuResult<Value> {
        let script = encode(&script)?;
        self.request(context, |reply| TabCommand::Execute { script, reply })
            .await
            .map_err(injection)?
    }
}

async fn run_tab(
    context: ContextId,
    mut page: Page,
    port: RuntimePort,
    mut rx: mpsc::UnboundedReceiver<TabCommand>,
) {
    let mut agent: Option<EmbeddedAgent> = None;

    while let Some(command) = rx.recv().await {
        match command {
            TabCommand::Deliver { message, reply } => {
                let answer = agent
                    .as_mut()
                    .and_then(|a| a.on_message(&mut page, message));
                let _ = reply.send(answer);
            }
            TabCommand::InsertCss { css, reply } => {
                page.insert_css(&css);
                let _ = reply.send(());
            }
            TabCommand::Execute { script, reply } => {
                let _ = reply.send(page.execute(script));
            }
            TabCommand::LoadAgent { reply } => {
                let mut instance = EmbeddedAgent::new(port.clone());
                let started = instance.start(&mut page);
                if started {
                    agent = Some(instance);
                }
                let _ = reply.send(started);
            }
            TabCommand::Select { text, reply } => {
                let _ = reply.send(page.select_text(&text));
            }
            TabCommand::ClearSelection => page.clear_selection(),
            TabCommand::SelectionText { reply } => {
                let _ = reply.send(page.selected_text());
            }
            TabCommand::Snapshot { reply } => {
                let doc = page.document();
                let _ = reply.send(PageSnapshot {
                    url: page.url().to_string(),
                    html: doc.to_html(),
                    text: doc.text_content(doc.root()),
                    spans: count_spans(doc),
                    stylesheets: page.stylesheets().to_vec(),
                    notices: page.notices().to_vec(),
                    agent_loaded: page.agent_loaded(),
                });
            }
            TabCommand::Close => break,
        }
    }

    debug!("{} task finished", context);
}

//! Readiness Tracker
//!
//! Membership cache of page contexts known to host a live agent. Unknown
//! contexts are probed once with a bounded wait.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::host::{ContextId, PageHost};
use crate::protocol::{encode, is_pong, TabMessage};

#[derive(Default)]
struct Contexts {
    ready: HashSet<ContextId>,
    /// Times each context has been destroyed
    evictions: HashMap<ContextId, u64>,
}

pub struct ReadinessTracker {
    host: Arc<dyn PageHost>,
    contexts: Mutex<Contexts>,
    probe_timeout: Duration,
}

impl ReadinessTracker {
    pub fn new(host: Arc<dyn PageHost>, probe_timeout: Duration) -> Self {
        Self {
            host,
            contexts: Mutex::new(Contexts::default()),
            probe_timeout,
        }
    }

    /// Whether `context` hosts a responsive agent
    pub async fn is_ready(&self, context: ContextId) -> bool {
        if self.contains(context) {
            debug!("{} already known ready", context);
            return true;
        }

        let evictions = self.evictions(context);
        if !self.probe(context).await {
            return false;
        }

        let mut contexts = self.lock();
        if contexts.evictions.get(&context).copied().unwrap_or(0) != evictions {
            debug!("{} destroyed while probing, not caching", context);
            return false;
        }
        if contexts.ready.insert(context) {
            info!("✅ {} marked ready", context);
        }
        true
    }

    /// Record an agent's readiness announcement
    pub fn mark_ready(&self, context: ContextId) {
        if self.lock().ready.insert(context) {
            info!("✅ {} marked ready", context);
        }
    }

    /// Evict a destroyed context
    pub fn forget(&self, context: ContextId) {
        let mut contexts = self.lock();
        *contexts.evictions.entry(context).or_insert(0) += 1;
        if contexts.ready.remove(&context) {
            info!("🧹 {} destroyed, forgetting readiness", context);
        }
    }

    pub fn contains(&self, context: ContextId) -> bool {
        self.lock().ready.contains(&context)
    }

    pub fn len(&self) -> usize {
        self.lock().ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().ready.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Contexts> {
        self.contexts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn evictions(&self, context: ContextId) -> u64 {
        self.lock().evictions.get(&context).copied().unwrap_or(0)
    }

    async fn probe(&self, context: ContextId) -> bool {
        debug!("📡 Probing {}", context);
        let ping = match encode(&TabMessage::Ping) {
            Ok(ping) => ping,
            Err(e) => {
                warn!("Failed to encode probe: {}", e);
                return false;
            }
        };

        match tokio::time::timeout(self.probe_timeout, self.host.send_message(context, ping)).await
        {
            Ok(Ok(Some(reply))) if is_pong(&reply) => {
                info!("📡 {} answered probe", context);
                true
            }
            Ok(Ok(reply)) => {
                debug!("{} gave a non-matching probe reply: {:?}", context, reply);
                false
            }
            Ok(Err(e)) => {
                warn!("Probe to {} failed: {}", context, e);
                false
            }
            Err(_) => {
                warn!(
                    "Probe to {} unanswered after {}ms",
                    context,
                    self.probe_timeout.as_millis()
                );
                false
            }
        }
    }
}

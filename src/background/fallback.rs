//! Fallback Injector
//!
//! Used when no agent answers: injects the stylesheet, then a
//! self-contained highlight script carrying its inputs as arguments.

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{KakuError, KakuResult};
use crate::highlight::stylesheet::stylesheet;
use crate::host::{ContextId, PageHost};
use crate::protocol::InjectedScript;
use crate::token::{preview, Token};

#[derive(Clone)]
pub struct FallbackInjector {
    host: Arc<dyn PageHost>,
}

impl FallbackInjector {
    pub fn new(host: Arc<dyn PageHost>) -> Self {
        Self { host }
    }

    /// Inject and run the highlight script; returns the span count.
    /// A zero count is a result, not an error; injection failures are errors.
    pub async fn inject(&self, context: ContextId, text: &str, tokens: &[Token]) -> KakuResult<usize> {
        info!("💉 Injecting fallback highlighter into {} for \"{}\"", context, preview(text));

        self.host.insert_css(context, &stylesheet()).await?;

        let result = self
            .host
            .execute_script(
                context,
                InjectedScript::HighlightText {
                    text: text.to_string(),
                    tokens: tokens.to_vec(),
                },
            )
            .await?;

        let count = match result.as_u64() {
            Some(n) => usize::try_from(n)
                .map_err(|_| KakuError::Injection(format!("span count out of range: {n}")))?,
            None => {
                warn!("Injected script returned a non-count result: {}", result);
                0
            }
        };

        info!("💉 Fallback highlighted {} spans in {}", count, context);
        Ok(count)
    }
}

//! Cross-Context Message Types
//!
//! JSON-serializable messages exchanged between the privileged process
//! and page contexts. Nothing else crosses the boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::token::Token;

/// Messages sent from a page's agent to the privileged process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum RuntimeMessage {
    /// Agent finished initializing on this page
    ContentScriptReady { url: String },
}

/// Messages sent from the privileged process to a page's agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum TabMessage {
    /// Liveness probe
    Ping,

    /// Highlight the current selection
    HighlightText {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tokens: Option<Vec<Token>>,
    },
}

/// Replies an agent sends back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum TabReply {
    Pong,
}

/// Self-contained script executed in a page by the privileged process.
/// All inputs travel as arguments; the page runs its own copy of the logic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "func", content = "args", rename_all = "kebab-case")]
pub enum InjectedScript {
    /// Run the highlight engine; evaluates to the span count
    HighlightText { text: String, tokens: Vec<Token> },

    /// Show a blocking notice to the user
    Alert { message: String },
}

/// Encode a message for the boundary
pub fn encode<T: Serialize>(message: &T) -> serde_json::Result<Value> {
    serde_json::to_value(message)
}

/// Whether a reply is a liveness acknowledgment
pub fn is_pong(reply: &Value) -> bool {
    matches!(
        serde_json::from_value::<TabReply>(reply.clone()),
        Ok(TabReply::Pong)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shapes() {
        assert_eq!(encode(&TabMessage::Ping).unwrap(), json!({"action": "ping"}));
        assert_eq!(encode(&TabReply::Pong).unwrap(), json!({"action": "pong"}));
        assert_eq!(
            encode(&RuntimeMessage::ContentScriptReady {
                url: "https://example.jp/".to_string()
            })
            .unwrap(),
            json!({"action": "content-script-ready", "url": "https://example.jp/"})
        );
    }

    #[test]
    fn test_highlight_text_payload() {
        let msg = TabMessage::HighlightText {
            text: "東京".to_string(),
            tokens: Some(vec![Token::new("東京", "名詞")]),
        };
        assert_eq!(
            encode(&msg).unwrap(),
            json!({
                "action": "highlight-text",
                "text": "東京",
                "tokens": [{"surface": "東京", "pos": "名詞"}]
            })
        );

        let bare: TabMessage =
            serde_json::from_value(json!({"action": "highlight-text", "text": "猫"})).unwrap();
        assert_eq!(
            bare,
            TabMessage::HighlightText {
                text: "猫".to_string(),
                tokens: None
            }
        );
    }

    #[test]
    fn test_pong_detection() {
        assert!(is_pong(&json!({"action": "pong"})));
        assert!(!is_pong(&json!({"action": "ping"})));
        assert!(!is_pong(&json!(true)));
        assert!(!is_pong(&Value::Null));
    }

    #[test]
    fn test_injected_script_shape() {
        let script = InjectedScript::Alert {
            message: "failed".to_string(),
        };
        assert_eq!(
            encode(&script).unwrap(),
            json!({"func": "alert", "args": {"message": "failed"}})
        );
    }
}

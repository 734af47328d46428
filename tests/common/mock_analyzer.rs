//! Mock Analysis Service for Testing
//!
//! Returns canned tokens (or a network failure) and records every request.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use kakuyaku::analysis::Analyzer;
use kakuyaku::error::{KakuError, KakuResult};
use kakuyaku::token::Token;

pub struct MockAnalyzer {
    tokens: Option<Vec<Token>>,
    /// All texts sent for analysis
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl MockAnalyzer {
    pub fn with_tokens(tokens: Vec<Token>) -> Self {
        Self {
            tokens: Some(tokens),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Analyzer whose service is unreachable
    pub fn unreachable() -> Self {
        Self {
            tokens: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn get_requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Analyzer for MockAnalyzer {
    async fn analyze(&self, text: &str) -> KakuResult<Vec<Token>> {
        self.requests.lock().unwrap().push(text.to_string());
        self.tokens
            .clone()
            .ok_or_else(|| KakuError::Network("Mock analysis service unreachable".to_string()))
    }
}

//! Kakuyaku Library
//!
//! Part-of-speech highlighting for Japanese text selected in a page.

pub mod analysis;
pub mod background;
pub mod config;
pub mod dom;
pub mod error;
pub mod highlight;
pub mod host;
pub mod page;
pub mod protocol;
pub mod token;

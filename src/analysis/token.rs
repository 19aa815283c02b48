use serde::{Serialize, Deserialize};
use crate::core::types::TokenLocation;

/// A run of indexable text and where it starts in the original field text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFragment {
    pub offset: u32,   // Char offset of the fragment in the source text
    pub text: String,
}

impl TextFragment {
    pub fn new(offset: u32, text: impl Into<String>) -> Self {
        TextFragment { offset, text: text.into() }
    }

    pub fn whole(text: impl Into<String>) -> Self {
        Self::new(0, text)
    }
}

/// One distinct normalized token value and every place it occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGroup {
    pub value: String,
    pub locations: Vec<TokenLocation>,  // Ascending by token index
}

impl TokenGroup {
    pub fn new(value: String, locations: Vec<TokenLocation>) -> Self {
        TokenGroup { value, locations }
    }
}

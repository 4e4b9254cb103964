use crate::{IndexError, Result};

/// Separator the upstream tagger uses when joining tags.
pub const TAG_SEPARATOR: &str = ", ";

/// Split a caption into terms on `", "`, keeping case and empty pieces.
pub fn tokenize(caption: &str) -> Vec<String> {
    caption.split(TAG_SEPARATOR).map(str::to_string).collect()
}

/// Built-in tokenizers, persisted by identifier rather than by code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tokenizer {
    #[default]
    CommaSpace,
}

impl Tokenizer {
    pub fn id(&self) -> &'static str {
        match self {
            Tokenizer::CommaSpace => "comma-space/v1",
        }
    }

    /// Resolve a persisted identifier, accepting the names older indexes were written with.
    pub fn from_id(id: &str) -> Result<Self> {
        match id {
            "comma-space/v1" | "comma-space" | "custom_tokenizer" => Ok(Tokenizer::CommaSpace),
            other => Err(IndexError::UnsupportedTokenizer(other.to_string())),
        }
    }

    pub fn tokenize(&self, caption: &str) -> Vec<String> {
        match self {
            Tokenizer::CommaSpace => tokenize(caption),
        }
    }
}

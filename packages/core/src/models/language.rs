//! Languages (Cultures) Known to the System

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    /// Culture code, e.g. `en-US`
    pub iso_code: String,
    pub is_default: bool,
    /// Content cannot be published unless this culture is published too
    pub is_mandatory: bool,
}

impl Language {
    pub fn new(iso_code: impl Into<String>) -> Self {
        Self {
            iso_code: iso_code.into(),
            is_default: false,
            is_mandatory: false,
        }
    }

    pub fn default_language(mut self) -> Self {
        self.is_default = true;
        self
    }

    pub fn mandatory(mut self) -> Self {
        self.is_mandatory = true;
        self
    }
}

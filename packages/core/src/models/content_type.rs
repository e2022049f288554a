//! Content Type Definitions
//!
//! A content type is the schema a [`ContentNode`](super::ContentNode) is built
//! from: its property definitions and whether it varies by culture. Nodes only
//! hold a [`ContentTypeRef`]; the full definition is looked up from the
//! content type repository whenever validation needs it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// How a content type (or a single property) varies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentVariation {
    /// Invariant: one value for every culture (`*`)
    #[default]
    Nothing,
    /// One value per culture
    Culture,
}

impl ContentVariation {
    pub fn varies_by_culture(&self) -> bool {
        matches!(self, ContentVariation::Culture)
    }
}

/// Property editors known to the core
///
/// Each editor knows the JSON shape its stored values must have. Richer
/// editors only need to plug in here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyEditor {
    TextBox,
    TextArea,
    Integer,
    Decimal,
    Boolean,
    DateTime,
    Json,
}

impl PropertyEditor {
    /// Check that a non-empty value has the shape this editor stores
    pub fn validate_value(&self, value: &Value) -> Result<(), String> {
        let ok = match self {
            PropertyEditor::TextBox | PropertyEditor::TextArea => value.is_string(),
            PropertyEditor::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value
                        .as_str()
                        .map(|s| s.trim().parse::<i64>().is_ok())
                        .unwrap_or(false)
            }
            PropertyEditor::Decimal => {
                value.is_number()
                    || value
                        .as_str()
                        .map(|s| s.trim().parse::<f64>().is_ok())
                        .unwrap_or(false)
            }
            PropertyEditor::Boolean => {
                value.is_boolean() || matches!(value.as_str(), Some("0") | Some("1"))
            }
            PropertyEditor::DateTime => value
                .as_str()
                .map(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok())
                .unwrap_or(false),
            PropertyEditor::Json => true,
        };

        if ok {
            Ok(())
        } else {
            Err(format!("value {} is not valid for editor {:?}", value, self))
        }
    }
}

/// Definition of one property on a content type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyType {
    pub alias: String,
    pub name: String,
    pub editor: PropertyEditor,
    pub variation: ContentVariation,
    pub mandatory: bool,
    pub validation_regex: Option<String>,
    pub max_length: Option<usize>,
}

impl PropertyType {
    pub fn new(alias: impl Into<String>, editor: PropertyEditor) -> Self {
        let alias = alias.into();
        Self {
            name: alias.clone(),
            alias,
            editor,
            variation: ContentVariation::Nothing,
            mandatory: false,
            validation_regex: None,
            max_length: None,
        }
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn varies_by_culture(mut self) -> Self {
        self.variation = ContentVariation::Culture;
        self
    }

    pub fn with_regex(mut self, pattern: impl Into<String>) -> Self {
        self.validation_regex = Some(pattern.into());
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }
}

/// Schema definition for content nodes
///
/// # Examples
///
/// ```rust
/// use contenttree_core::models::{ContentType, ContentVariation, PropertyEditor, PropertyType};
///
/// let article = ContentType::new("article", "Article", ContentVariation::Culture)
///     .with_property(PropertyType::new("title", PropertyEditor::TextBox).mandatory().varies_by_culture())
///     .with_property(PropertyType::new("rating", PropertyEditor::Integer));
///
/// assert!(article.varies_by_culture());
/// assert!(article.property_type("title").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentType {
    /// Assigned by the repository on first save (0 until then)
    pub id: i64,
    pub key: Uuid,
    pub alias: String,
    pub name: String,
    pub variation: ContentVariation,
    pub property_types: Vec<PropertyType>,
}

impl ContentType {
    pub fn new(
        alias: impl Into<String>,
        name: impl Into<String>,
        variation: ContentVariation,
    ) -> Self {
        Self {
            id: 0,
            key: Uuid::new_v4(),
            alias: alias.into(),
            name: name.into(),
            variation,
            property_types: Vec::new(),
        }
    }

    pub fn with_property(mut self, property_type: PropertyType) -> Self {
        self.property_types.push(property_type);
        self
    }

    pub fn varies_by_culture(&self) -> bool {
        self.variation.varies_by_culture()
    }

    pub fn property_type(&self, alias: &str) -> Option<&PropertyType> {
        self.property_types.iter().find(|p| p.alias == alias)
    }

    /// Lightweight reference stored on every node of this type
    pub fn reference(&self) -> ContentTypeRef {
        ContentTypeRef {
            id: self.id,
            alias: self.alias.clone(),
            variation: self.variation,
        }
    }
}

/// What a node knows about its content type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentTypeRef {
    pub id: i64,
    pub alias: String,
    pub variation: ContentVariation,
}

impl ContentTypeRef {
    pub fn varies_by_culture(&self) -> bool {
        self.variation.varies_by_culture()
    }
}

//! Property Validation
//!
//! Checks the draft values a publish is about to copy into the published
//! version. Each property type contributes up to four rules, applied in
//! order: mandatory, editor value shape, validation pattern, maximum length.
//! A property failing any rule is reported once by alias.

use crate::models::{ContentNode, ContentType, PropertyType, INVARIANT_CULTURE};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// Alias reported when a variant culture being published has no name
pub const NAME_ALIAS: &str = "@name";

#[derive(Debug, Default)]
pub struct PropertyValidationService {
    patterns: Mutex<HashMap<String, Option<Regex>>>,
}

impl PropertyValidationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aliases of properties whose values may not be published for `cultures`
    ///
    /// `cultures` holds `*` for invariant content and culture codes for
    /// variant content; a `*` on variant content means every available
    /// culture. Invariant properties are checked once whatever the cultures.
    pub fn validate_for_publish(
        &self,
        node: &ContentNode,
        content_type: &ContentType,
        cultures: &[String],
    ) -> Vec<String> {
        let cultures: Vec<String> = if node.varies_by_culture()
            && cultures.iter().any(|c| c == INVARIANT_CULTURE)
        {
            node.available_cultures()
        } else {
            cultures.to_vec()
        };

        let mut invalid = Vec::new();

        if node.varies_by_culture() {
            for culture in &cultures {
                if node.culture_name(culture).map(str::is_empty).unwrap_or(true) {
                    debug!("Culture {} of node {} has no name", culture, node.id);
                    push_unique(&mut invalid, NAME_ALIAS);
                }
            }
        }

        for property_type in &content_type.property_types {
            let checked: Vec<Option<&str>> =
                if property_type.variation.varies_by_culture() && node.varies_by_culture() {
                    cultures.iter().map(|c| Some(c.as_str())).collect()
                } else {
                    vec![None]
                };

            for culture in checked {
                let value = node.value(&property_type.alias, culture);
                if let Err(reason) = self.validate_value(property_type, value) {
                    debug!(
                        "Property {} of node {} is invalid ({}): {}",
                        property_type.alias,
                        node.id,
                        culture.unwrap_or(INVARIANT_CULTURE),
                        reason
                    );
                    push_unique(&mut invalid, &property_type.alias);
                }
            }
        }

        invalid
    }

    /// Check one value against one property type
    pub fn validate_value(
        &self,
        property_type: &PropertyType,
        value: Option<&Value>,
    ) -> Result<(), String> {
        let value = match value {
            Some(v) if !is_empty(v) => v,
            _ if property_type.mandatory => {
                return Err(format!("{} is mandatory", property_type.alias));
            }
            _ => return Ok(()),
        };

        property_type.editor.validate_value(value)?;

        if let Some(pattern) = &property_type.validation_regex {
            let text = as_text(value);
            match self.compiled(pattern) {
                Some(regex) if regex.is_match(&text) => {}
                Some(_) => {
                    return Err(format!(
                        "{} does not match {}",
                        property_type.alias, pattern
                    ));
                }
                None => {
                    return Err(format!(
                        "{} has an unusable validation pattern",
                        property_type.alias
                    ));
                }
            }
        }

        if let Some(max_length) = property_type.max_length {
            if as_text(value).chars().count() > max_length {
                return Err(format!(
                    "{} is longer than {} characters",
                    property_type.alias, max_length
                ));
            }
        }

        Ok(())
    }

    fn compiled(&self, pattern: &str) -> Option<Regex> {
        let mut patterns = self.patterns.lock().unwrap_or_else(PoisonError::into_inner);
        patterns
            .entry(pattern.to_string())
            .or_insert_with(|| match Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    warn!("Invalid validation pattern {}: {}", pattern, e);
                    None
                }
            })
            .clone()
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn push_unique(aliases: &mut Vec<String>, alias: &str) {
    if !aliases.iter().any(|a| a == alias) {
        aliases.push(alias.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentVariation, PropertyEditor, ROOT_ID};
    use serde_json::json;

    fn article() -> ContentType {
        ContentType::new("article", "Article", ContentVariation::Culture)
            .with_property(
                PropertyType::new("title", PropertyEditor::TextBox)
                    .mandatory()
                    .varies_by_culture()
                    .with_max_length(10),
            )
            .with_property(PropertyType::new("code", PropertyEditor::TextBox).with_regex("^[A-Z]{3}$"))
    }

    #[test]
    fn test_mandatory_and_pattern_rules() {
        let ct = article();
        let mut node = ContentNode::new_with_culture("Hello", "en-US", ROOT_ID, &ct, -1);
        node.set_value("code", None, json!("abc"));

        let service = PropertyValidationService::new();
        let invalid = service.validate_for_publish(&node, &ct, &["en-US".to_string()]);
        assert_eq!(invalid, vec!["title".to_string(), "code".to_string()]);

        node.set_value("title", Some("en-US"), json!("Hi"));
        node.set_value("code", None, json!("ABC"));
        assert!(service
            .validate_for_publish(&node, &ct, &["en-US".to_string()])
            .is_empty());
    }

    #[test]
    fn test_unnamed_culture_is_reported() {
        let ct = article();
        let mut node = ContentNode::new_with_culture("Hello", "en-US", ROOT_ID, &ct, -1);
        node.set_value("title", Some("da-DK"), json!("Hej"));

        let service = PropertyValidationService::new();
        let invalid = service.validate_for_publish(&node, &ct, &["da-DK".to_string()]);
        assert_eq!(invalid, vec![NAME_ALIAS.to_string()]);
    }

    #[test]
    fn test_max_length_counts_characters() {
        let service = PropertyValidationService::new();
        let title = PropertyType::new("title", PropertyEditor::TextBox).with_max_length(3);
        assert!(service.validate_value(&title, Some(&json!("åäö"))).is_ok());
        assert!(service.validate_value(&title, Some(&json!("abcd"))).is_err());
    }

    #[test]
    fn test_bad_pattern_fails_closed() {
        let service = PropertyValidationService::new();
        let broken = PropertyType::new("code", PropertyEditor::TextBox).with_regex("(");
        assert!(service.validate_value(&broken, Some(&json!("x"))).is_err());
        assert!(service.validate_value(&broken, None).is_ok());
    }
}

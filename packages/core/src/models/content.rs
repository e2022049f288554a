//! Content Node Data Structures
//!
//! This module defines [`ContentNode`], one entry in the content tree, along
//! with its culture and property value types.
//!
//! # Tree Layout
//!
//! - Every node has a materialized `path`: the comma-separated chain of
//!   ancestor ids, starting at the virtual root `-1` and ending with its own id
//!   (e.g. `-1,1050,1063`).
//! - `level` is the depth below the root: children of `-1` have level 1.
//! - Trashed nodes live under the recycle bin (`-20`), whose own level is 0,
//!   so every trashed path starts with `-1,-20`.
//!
//! # Cultures
//!
//! Invariant content (content type variation `Nothing`) has exactly one
//! implicit culture, [`INVARIANT_CULTURE`] (`*`). Culture-variant content keeps
//! one name and one set of culture-variant property values per culture.
//!
//! # Edited vs. Published
//!
//! Each property value is stored twice: the edited (draft) value and the
//! published value. A node (or culture) is "edited" when its draft differs
//! from what is published, or when it has never been published.

use crate::models::content_type::{ContentType, ContentTypeRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Id of the virtual tree root
pub const ROOT_ID: i64 = -1;

/// Id of the content recycle bin
pub const RECYCLE_BIN_ID: i64 = -20;

/// Path of the content recycle bin; every trashed node's path starts with it
pub const RECYCLE_BIN_PATH: &str = "-1,-20";

/// Level of the recycle bin itself
pub const RECYCLE_BIN_LEVEL: i32 = 0;

/// The pseudo-culture used by invariant content
pub const INVARIANT_CULTURE: &str = "*";

/// User id used when no acting user is supplied
pub const SUPER_USER_ID: i64 = -1;

/// Publication state of a node
///
/// `Publishing` and `Unpublishing` are transient: they are set by the service
/// right before the node is committed, and the repository resolves them into
/// `Published`/`Unpublished` when the node is saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PublishedState {
    Published,
    #[default]
    Unpublished,
    Publishing,
    Unpublishing,
}

/// Display name and timestamp for one culture of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CultureInfo {
    pub culture: String,
    pub name: String,
    pub date: DateTime<Utc>,
}

/// Draft and published value of one property for one culture
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyValue {
    pub edited: Option<Value>,
    pub published: Option<Value>,
}

impl PropertyValue {
    pub fn is_edited(&self) -> bool {
        self.edited != self.published
    }
}

/// Values of one property, keyed by culture (`*` for invariant values)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub alias: String,
    pub values: BTreeMap<String, PropertyValue>,
}

impl Property {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn value(&self, culture: &str, published: bool) -> Option<&Value> {
        let value = self.values.get(culture)?;
        if published {
            value.published.as_ref()
        } else {
            value.edited.as_ref()
        }
    }

    fn set_value(&mut self, culture: &str, value: Option<Value>) {
        self.values.entry(culture.to_string()).or_default().edited = value;
    }

    fn publish(&mut self, culture: &str) {
        if let Some(value) = self.values.get_mut(culture) {
            value.published = value.edited.clone();
        }
    }

    fn unpublish(&mut self, culture: &str) {
        if let Some(value) = self.values.get_mut(culture) {
            value.published = None;
        }
    }

    fn is_edited(&self, culture: &str) -> bool {
        self.values
            .get(culture)
            .map(PropertyValue::is_edited)
            .unwrap_or(false)
    }
}

/// One entry in the content tree
///
/// Structural fields (identity, path, level, sort order, publication flags)
/// are public because the services and repositories maintain them. Editable
/// values (names and property values) go through setters so that unsaved
/// changes can be detected with [`ContentNode::is_dirty`].
///
/// # Examples
///
/// ```rust
/// use contenttree_core::models::{ContentNode, ContentType, ContentVariation, ROOT_ID};
/// use serde_json::json;
///
/// let page = ContentType::new("page", "Page", ContentVariation::Nothing);
/// let mut node = ContentNode::new("Home", ROOT_ID, &page, -1);
/// node.set_value("title", None, json!("Welcome"));
///
/// assert!(!node.has_identity());
/// assert!(node.is_dirty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentNode {
    /// Integer identity, 0 until the node is first saved
    pub id: i64,

    /// Stable external identity
    pub key: Uuid,

    pub parent_id: i64,

    /// Comma-separated ancestor id chain, ending with this node's id
    pub path: String,

    pub level: i32,
    pub sort_order: i32,
    pub trashed: bool,

    /// Whether a published version exists
    pub published: bool,

    pub published_state: PublishedState,

    /// Whether the draft differs from the published version
    pub edited: bool,

    pub content_type: ContentTypeRef,

    pub creator_id: i64,
    pub writer_id: i64,

    pub create_date: DateTime<Utc>,
    pub update_date: DateTime<Utc>,
    pub publish_date: Option<DateTime<Utc>>,

    /// Id of the current draft version (0 until first save)
    pub version_id: i64,

    /// Id of the version that is currently published
    pub published_version_id: Option<i64>,

    name: Option<String>,
    published_name: Option<String>,
    culture_infos: BTreeMap<String, CultureInfo>,
    publish_culture_infos: BTreeMap<String, CultureInfo>,
    edited_cultures: BTreeSet<String>,
    properties: BTreeMap<String, Property>,

    #[serde(skip)]
    dirty: bool,

    #[serde(skip)]
    dirty_cultures: BTreeSet<String>,

    #[serde(skip)]
    publishing_cultures: BTreeSet<String>,

    #[serde(skip)]
    unpublishing_cultures: BTreeSet<String>,
}

impl ContentNode {
    /// Create a new, uninitialized node (no identity, no path)
    ///
    /// For culture-variant content types the name is stored as the invariant
    /// fallback name; use [`ContentNode::new_with_culture`] or
    /// [`ContentNode::set_culture_name`] to name individual cultures.
    pub fn new(
        name: impl Into<String>,
        parent_id: i64,
        content_type: &ContentType,
        creator_id: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            key: Uuid::new_v4(),
            parent_id,
            path: String::new(),
            level: 0,
            sort_order: 0,
            trashed: false,
            published: false,
            published_state: PublishedState::Unpublished,
            edited: true,
            content_type: content_type.reference(),
            creator_id,
            writer_id: creator_id,
            create_date: now,
            update_date: now,
            publish_date: None,
            version_id: 0,
            published_version_id: None,
            name: Some(name.into()),
            published_name: None,
            culture_infos: BTreeMap::new(),
            publish_culture_infos: BTreeMap::new(),
            edited_cultures: BTreeSet::new(),
            properties: BTreeMap::new(),
            dirty: true,
            dirty_cultures: BTreeSet::new(),
            publishing_cultures: BTreeSet::new(),
            unpublishing_cultures: BTreeSet::new(),
        }
    }

    /// Create a new node of a culture-variant type, named for one culture
    pub fn new_with_culture(
        name: impl Into<String>,
        culture: &str,
        parent_id: i64,
        content_type: &ContentType,
        creator_id: i64,
    ) -> Self {
        let name = name.into();
        let mut node = Self::new(name.clone(), parent_id, content_type, creator_id);
        if node.varies_by_culture() {
            node.set_culture_name(culture, name);
        }
        node
    }

    pub fn has_identity(&self) -> bool {
        self.id != 0
    }

    pub fn varies_by_culture(&self) -> bool {
        self.content_type.varies_by_culture()
    }

    //
    // NAMES
    //

    /// Display name: the invariant name, or the first culture name for
    /// variant content that has no invariant name
    pub fn name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or_else(|| self.culture_infos.values().next().map(|c| c.name.as_str()))
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
        self.dirty = true;
    }

    pub fn culture_name(&self, culture: &str) -> Option<&str> {
        if culture == INVARIANT_CULTURE || !self.varies_by_culture() {
            return self.name.as_deref();
        }
        self.culture_infos.get(culture).map(|c| c.name.as_str())
    }

    pub fn set_culture_name(&mut self, culture: &str, name: impl Into<String>) {
        if culture == INVARIANT_CULTURE || !self.varies_by_culture() {
            self.set_name(name);
            return;
        }
        self.culture_infos.insert(
            culture.to_string(),
            CultureInfo {
                culture: culture.to_string(),
                name: name.into(),
                date: Utc::now(),
            },
        );
        self.dirty_cultures.insert(culture.to_string());
        self.dirty = true;
    }

    //
    // CULTURES
    //

    /// Cultures this node has content for (`*` for invariant content)
    pub fn available_cultures(&self) -> Vec<String> {
        if self.varies_by_culture() {
            self.culture_infos.keys().cloned().collect()
        } else {
            vec![INVARIANT_CULTURE.to_string()]
        }
    }

    pub fn is_culture_available(&self, culture: &str) -> bool {
        if self.varies_by_culture() {
            self.culture_infos.contains_key(culture)
        } else {
            culture == INVARIANT_CULTURE
        }
    }

    pub fn is_culture_published(&self, culture: &str) -> bool {
        if self.varies_by_culture() {
            self.publish_culture_infos.contains_key(culture)
        } else {
            self.published
        }
    }

    pub fn is_culture_edited(&self, culture: &str) -> bool {
        if self.varies_by_culture() {
            self.edited_cultures.contains(culture)
        } else {
            self.edited
        }
    }

    pub fn published_cultures(&self) -> Vec<String> {
        self.publish_culture_infos.keys().cloned().collect()
    }

    pub fn edited_cultures(&self) -> Vec<String> {
        self.edited_cultures.iter().cloned().collect()
    }

    pub fn culture_infos(&self) -> impl Iterator<Item = &CultureInfo> {
        self.culture_infos.values()
    }

    pub fn publish_culture_infos(&self) -> impl Iterator<Item = &CultureInfo> {
        self.publish_culture_infos.values()
    }

    /// Cultures whose name changed since the node was last saved
    pub fn dirty_cultures(&self) -> Vec<String> {
        self.dirty_cultures.iter().cloned().collect()
    }

    //
    // PROPERTY VALUES
    //

    /// Draft value of a property (`None` culture = invariant value)
    pub fn value(&self, alias: &str, culture: Option<&str>) -> Option<&Value> {
        self.properties
            .get(alias)?
            .value(culture.unwrap_or(INVARIANT_CULTURE), false)
    }

    /// Published value of a property (`None` culture = invariant value)
    pub fn published_value(&self, alias: &str, culture: Option<&str>) -> Option<&Value> {
        self.properties
            .get(alias)?
            .value(culture.unwrap_or(INVARIANT_CULTURE), true)
    }

    pub fn set_value(&mut self, alias: &str, culture: Option<&str>, value: Value) {
        self.properties
            .entry(alias.to_string())
            .or_insert_with(|| Property::new(alias))
            .set_value(culture.unwrap_or(INVARIANT_CULTURE), Some(value));
        if let Some(culture) = culture {
            self.dirty_cultures.insert(culture.to_string());
        }
        self.dirty = true;
    }

    pub fn clear_value(&mut self, alias: &str, culture: Option<&str>) {
        if let Some(property) = self.properties.get_mut(alias) {
            property.set_value(culture.unwrap_or(INVARIANT_CULTURE), None);
            self.dirty = true;
        }
    }

    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    //
    // DIRTY TRACKING
    //

    /// Whether the node has changes that were never handed to the repository
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the node as matching its persisted state
    pub fn reset_dirty(&mut self) {
        self.dirty = false;
        self.dirty_cultures.clear();
    }

    //
    // PUBLISHING
    //

    /// Copy draft values to published values for a culture
    ///
    /// `*` publishes the invariant values of invariant content, or every
    /// available culture of variant content. Invariant properties are always
    /// published along with a culture. Validation happens before this is
    /// called; this only moves values.
    pub fn publish_culture_values(&mut self, culture: &str, now: DateTime<Utc>) {
        for property in self.properties.values_mut() {
            property.publish(INVARIANT_CULTURE);
        }

        if !self.varies_by_culture() {
            self.published_name = self.name.clone();
            self.publishing_cultures.insert(INVARIANT_CULTURE.to_string());
            return;
        }

        let cultures = if culture == INVARIANT_CULTURE {
            self.available_cultures()
        } else {
            vec![culture.to_string()]
        };

        for culture in cultures {
            for property in self.properties.values_mut() {
                property.publish(&culture);
            }
            if let Some(info) = self.culture_infos.get(&culture) {
                self.publish_culture_infos.insert(
                    culture.clone(),
                    CultureInfo {
                        culture: culture.clone(),
                        name: info.name.clone(),
                        date: now,
                    },
                );
            }
            self.unpublishing_cultures.remove(&culture);
            self.publishing_cultures.insert(culture);
        }
    }

    /// Remove a culture from the published version
    ///
    /// Returns false when the culture was not published.
    pub fn unpublish_culture_values(&mut self, culture: &str) -> bool {
        if !self.varies_by_culture() || culture == INVARIANT_CULTURE {
            return false;
        }
        if self.publish_culture_infos.remove(culture).is_none() {
            return false;
        }
        for property in self.properties.values_mut() {
            property.unpublish(culture);
        }
        self.publishing_cultures.remove(culture);
        self.unpublishing_cultures.insert(culture.to_string());
        true
    }

    /// Cultures published since the last commit (drained by the caller)
    pub fn take_publishing_cultures(&mut self) -> Vec<String> {
        std::mem::take(&mut self.publishing_cultures)
            .into_iter()
            .collect()
    }

    /// Cultures unpublished since the last commit (drained by the caller)
    pub fn take_unpublishing_cultures(&mut self) -> Vec<String> {
        std::mem::take(&mut self.unpublishing_cultures)
            .into_iter()
            .collect()
    }

    /// Forget which cultures were published or unpublished since the last commit
    pub fn clear_pending_cultures(&mut self) {
        self.publishing_cultures.clear();
        self.unpublishing_cultures.clear();
    }

    /// Resolve a transient published state into a persisted one
    ///
    /// Called by repositories when the node is saved.
    pub fn apply_pending_published_state(&mut self, now: DateTime<Utc>) {
        match self.published_state {
            PublishedState::Publishing => {
                self.published = true;
                self.published_state = PublishedState::Published;
                self.publish_date = Some(now);
                self.published_version_id = Some(self.version_id);
            }
            PublishedState::Unpublishing => {
                self.clear_published_values();
                self.published = false;
                self.published_state = PublishedState::Unpublished;
                self.published_version_id = None;
            }
            PublishedState::Published | PublishedState::Unpublished => {}
        }
    }

    /// Drop every trace of a published version (used by copy)
    pub fn strip_published_state(&mut self) {
        self.clear_published_values();
        self.published = false;
        self.published_state = PublishedState::Unpublished;
        self.publish_date = None;
        self.published_version_id = None;
        self.publishing_cultures.clear();
        self.unpublishing_cultures.clear();
        self.refresh_edited_state();
    }

    fn clear_published_values(&mut self) {
        for property in self.properties.values_mut() {
            for value in property.values.values_mut() {
                value.published = None;
            }
        }
        self.published_name = None;
        self.publish_culture_infos.clear();
    }

    /// Recompute `edited` and the edited culture set from the stored values
    pub fn refresh_edited_state(&mut self) {
        let invariant_edited = self
            .properties
            .values()
            .any(|p| p.is_edited(INVARIANT_CULTURE));

        if !self.varies_by_culture() {
            self.edited = !self.published || invariant_edited || self.name != self.published_name;
            self.edited_cultures.clear();
            return;
        }

        let edited: BTreeSet<String> = self
            .culture_infos
            .values()
            .filter(|info| match self.publish_culture_infos.get(&info.culture) {
                None => true,
                Some(published) => {
                    invariant_edited
                        || published.name != info.name
                        || self.properties.values().any(|p| p.is_edited(&info.culture))
                }
            })
            .map(|info| info.culture.clone())
            .collect();

        self.edited = !self.published || invariant_edited || !edited.is_empty();
        self.edited_cultures = edited;
    }

    /// Replace editable values with those of another version of this node
    ///
    /// `culture` limits the copy to one culture's names and values; `None` or
    /// `*` copies everything.
    pub fn copy_values_from(&mut self, version: &ContentNode, culture: Option<&str>) {
        match culture {
            Some(culture) if culture != INVARIANT_CULTURE && self.varies_by_culture() => {
                match version.culture_infos.get(culture) {
                    Some(info) => {
                        self.culture_infos.insert(culture.to_string(), info.clone());
                    }
                    None => {
                        self.culture_infos.remove(culture);
                    }
                }
                for (alias, property) in &version.properties {
                    let edited = property
                        .values
                        .get(culture)
                        .and_then(|v| v.edited.clone());
                    self.properties
                        .entry(alias.clone())
                        .or_insert_with(|| Property::new(alias.clone()))
                        .set_value(culture, edited);
                }
                self.dirty_cultures.insert(culture.to_string());
            }
            _ => {
                self.name = version.name.clone();
                self.culture_infos = version.culture_infos.clone();
                let mut properties = BTreeMap::new();
                for (alias, property) in &version.properties {
                    let mut copy = Property::new(alias.clone());
                    for (culture, value) in &property.values {
                        copy.set_value(culture, value.edited.clone());
                        // keep whatever the current node has published
                        let published = self
                            .properties
                            .get(alias)
                            .and_then(|p| p.values.get(culture))
                            .and_then(|v| v.published.clone());
                        if let Some(v) = copy.values.get_mut(culture) {
                            v.published = published;
                        }
                    }
                    properties.insert(alias.clone(), copy);
                }
                self.properties = properties;
            }
        }
        self.dirty = true;
    }

    //
    // TREE
    //

    /// Ancestor ids (excluding the virtual root and the node itself)
    pub fn ancestor_ids(&self) -> Vec<i64> {
        self.path
            .split(',')
            .filter_map(|s| s.parse::<i64>().ok())
            .filter(|id| *id != ROOT_ID && *id != self.id)
            .collect()
    }

    /// Whether `path` belongs to this node or one of its descendants
    pub fn is_ancestor_or_self_of_path(&self, path: &str) -> bool {
        path == self.path || path.starts_with(&format!("{},", self.path))
    }

    /// Copy of this node with a fresh identity and no tree position
    pub fn deep_clone_with_reset_identity(&self) -> ContentNode {
        let mut copy = self.clone();
        copy.id = 0;
        copy.key = Uuid::new_v4();
        copy.version_id = 0;
        copy.path = String::new();
        copy.level = 0;
        copy.create_date = Utc::now();
        copy.update_date = copy.create_date;
        copy.dirty = true;
        copy
    }
}

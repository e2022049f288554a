//! Content Kinds
//!
//! Documents and elements share the save/publish/unpublish/delete skeleton.
//! What differs between them is a small closed set of capabilities, supplied
//! at compile time through [`ContentKind`]. Notifications are generic over
//! the kind, so a subscriber picks documents or elements by type.

use crate::scoping::LockId;
use std::fmt::Debug;

pub trait ContentKind: Debug + Send + Sync + 'static {
    /// Object type written to audit entries and domain events
    const NAME: &'static str;

    /// Tree-wide lock guarding this kind of content
    const LOCK: LockId;

    /// Whether nodes form a tree (deletes and moves cascade to descendants)
    const HIERARCHICAL: bool;
}

/// Hierarchical content living in the content tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Document;

impl ContentKind for Document {
    const NAME: &'static str = "Document";
    const LOCK: LockId = LockId::ContentTree;
    const HIERARCHICAL: bool = true;
}

/// Flat, publishable content blocks stored at root level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element;

impl ContentKind for Element {
    const NAME: &'static str = "Element";
    const LOCK: LockId = LockId::ElementTree;
    const HIERARCHICAL: bool = false;
}

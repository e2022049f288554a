//! Configuration for the content services

use serde::{Deserialize, Serialize};
use std::env;

/// Page sizes above this make one cascade page hold too much in memory
const MAX_PAGE_SIZE: usize = 10_000;

/// Default capacity of the domain event broadcast channel
pub const DOMAIN_EVENT_CHANNEL_CAPACITY: usize = 128;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentServiceConfig {
    /// Descendants loaded per page during a branch publish
    pub publish_branch_page_size: usize,

    /// Descendants loaded per page while moving a subtree
    pub move_page_size: usize,

    /// Descendants loaded per page while copying a subtree
    pub copy_page_size: usize,

    /// Descendants loaded per page while deleting a subtree
    pub delete_page_size: usize,

    /// Capacity of the domain event broadcast channel
    pub event_channel_capacity: usize,

    /// Refuse to delete nodes other content depends on
    pub disable_delete_when_referenced: bool,

    /// Refuse to unpublish nodes other content depends on
    pub disable_unpublish_when_referenced: bool,

    /// Longest node name a save accepts
    pub max_name_length: usize,
}

impl Default for ContentServiceConfig {
    fn default() -> Self {
        Self {
            publish_branch_page_size: 100,
            move_page_size: 500,
            copy_page_size: 500,
            delete_page_size: 500,
            event_channel_capacity: DOMAIN_EVENT_CHANNEL_CAPACITY,
            disable_delete_when_referenced: false,
            disable_unpublish_when_referenced: false,
            max_name_length: 255,
        }
    }
}

impl ContentServiceConfig {
    /// Defaults overridden by `CONTENT_*` environment variables
    ///
    /// Unset or unparsable variables keep their default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            publish_branch_page_size: env_or(
                "CONTENT_PUBLISH_BRANCH_PAGE_SIZE",
                defaults.publish_branch_page_size,
            ),
            move_page_size: env_or("CONTENT_MOVE_PAGE_SIZE", defaults.move_page_size),
            copy_page_size: env_or("CONTENT_COPY_PAGE_SIZE", defaults.copy_page_size),
            delete_page_size: env_or("CONTENT_DELETE_PAGE_SIZE", defaults.delete_page_size),
            event_channel_capacity: env_or(
                "CONTENT_EVENT_CHANNEL_CAPACITY",
                defaults.event_channel_capacity,
            ),
            disable_delete_when_referenced: env_or(
                "CONTENT_DISABLE_DELETE_WHEN_REFERENCED",
                defaults.disable_delete_when_referenced,
            ),
            disable_unpublish_when_referenced: env_or(
                "CONTENT_DISABLE_UNPUBLISH_WHEN_REFERENCED",
                defaults.disable_unpublish_when_referenced,
            ),
            max_name_length: env_or("CONTENT_MAX_NAME_LENGTH", defaults.max_name_length),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        let page_sizes = [
            ("publish_branch_page_size", self.publish_branch_page_size),
            ("move_page_size", self.move_page_size),
            ("copy_page_size", self.copy_page_size),
            ("delete_page_size", self.delete_page_size),
        ];
        for (name, size) in page_sizes {
            if size == 0 {
                return Err(format!("{} must be greater than 0", name));
            }
            if size > MAX_PAGE_SIZE {
                return Err(format!("{} cannot exceed {}", name, MAX_PAGE_SIZE));
            }
        }

        if self.event_channel_capacity == 0 {
            return Err("event_channel_capacity must be greater than 0".to_string());
        }

        if self.max_name_length == 0 {
            return Err("max_name_length must be greater than 0".to_string());
        }

        Ok(())
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

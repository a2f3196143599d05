//! Arrival queue sizing.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// `None` keeps the queue unbounded.
    #[validate(range(min = 1))]
    #[serde(default)]
    pub capacity: Option<usize>,

    /// `reject_new` or `drop_oldest`; only used when bounded.
    #[validate(custom(function = validation::validate_overflow_policy))]
    #[serde(default = "default_overflow")]
    pub overflow: String,
}

fn default_overflow() -> String {
    "reject_new".into()
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: None,
            overflow: default_overflow(),
        }
    }
}

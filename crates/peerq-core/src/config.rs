//! Queue configuration.

use serde::{Deserialize, Serialize};

/// Default channel capacity of a queue.
pub const DEFAULT_QUEUE_SIZE: usize = 100;

/// Settings for one [`EventQueue`](crate::EventQueue).
///
/// `capacity` is a backpressure knob: once the channel is full, producers
/// wait. Nothing is ever dropped on overflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub capacity: usize,

    /// Catch panics raised by callbacks and keep the loop alive.
    pub capture_faults: bool,

    /// Optional label used in logs and fault reports.
    pub name: Option<String>,
}

impl QueueConfig {
    pub fn new() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_SIZE,
            capture_faults: false,
            name: None,
        }
    }

    /// Capacity actually used for the channel (tokio rejects zero).
    pub fn effective_capacity(&self) -> usize {
        self.capacity.max(1)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn default_matches_queue_size_constant() {
        let cfg = QueueConfig::default();
        assert_eq!(cfg.capacity, DEFAULT_QUEUE_SIZE);
        assert!(!cfg.capture_faults);
        assert_eq!(cfg.name, None);
    }

    #[rstest]
    #[case::zero(0, 1)]
    #[case::one(1, 1)]
    #[case::default(100, 100)]
    fn effective_capacity_is_at_least_one(#[case] capacity: usize, #[case] expected: usize) {
        let cfg = QueueConfig {
            capacity,
            ..QueueConfig::default()
        };
        assert_eq!(cfg.effective_capacity(), expected);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg: QueueConfig = serde_json::from_str(r#"{ "capture_faults": true }"#).unwrap();
        assert_eq!(cfg.capacity, DEFAULT_QUEUE_SIZE);
        assert!(cfg.capture_faults);
    }
}

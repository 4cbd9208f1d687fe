//! Webhook processing configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::adapters::webhook::DEFAULT_QUEUE_CAPACITY;

const MAX_QUEUE_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Events held in memory while the worker catches up.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl WebhookConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.queue_capacity == 0 || self.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(ValidationError::InvalidQueueCapacity);
        }
        Ok(())
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(WebhookConfig::default().queue_capacity, 256);
        assert!(WebhookConfig::default().validate().is_ok());
    }

    #[test]
    fn test_capacity_bounds() {
        for (capacity, ok) in [(0, false), (1, true), (10_000, true), (10_001, false)] {
            let config = WebhookConfig {
                queue_capacity: capacity,
            };
            assert_eq!(config.validate().is_ok(), ok, "capacity {}", capacity);
        }
    }
}

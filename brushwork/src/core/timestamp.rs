//! Session-relative timestamps.
//!
//! The control core never reads a wall clock. Callers supply [`Duration`]
//! offsets from a session epoch of their choosing, which keeps every state
//! machine deterministic under test. Wire formats carry timestamps as integer
//! milliseconds.

use std::time::Duration;

/// Millisecond count for event payloads and logs.
pub fn to_millis(value: Duration) -> u64 {
    u64::try_from(value.as_millis()).unwrap_or(u64::MAX)
}

/// Serde adapter for `Duration` fields stored as integer milliseconds.
pub mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(super::to_millis(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_millis_truncates_submillisecond_precision() {
        assert_eq!(to_millis(Duration::from_micros(1_500)), 1);
        assert_eq!(to_millis(Duration::from_millis(500)), 500);
    }
}

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// One user message and the provider's reply, as persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Store-assigned identifier, `None` until the turn has been written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Owner of the conversation
    pub user_id: String,

    /// What the user sent
    pub message: String,

    /// What the provider answered
    pub response: String,

    /// When the exchange completed
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    /// Create a turn stamped with the current time
    pub fn new(
        user_id: impl Into<String>,
        message: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            user_id: user_id.into(),
            message: message.into(),
            response: response.into(),
            timestamp: stored_precision(Utc::now()),
        }
    }

    /// Override the timestamp (builder pattern)
    ///
    /// Truncated to microseconds like every constructor timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = stored_precision(timestamp);
        self
    }

    /// Attach the store-assigned identifier (builder pattern)
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

/// Timestamps keep microsecond precision, the resolution of `TIMESTAMPTZ`
fn stored_precision(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp.trunc_subsecs(6)
}

// Identity assigned by the store does not take part in equality.
impl PartialEq for ChatTurn {
    fn eq(&self, other: &Self) -> bool {
        self.user_id == other.user_id
            && self.message == other.message
            && self.response == other.response
            && self.timestamp == other.timestamp
    }
}

impl Eq for ChatTurn {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_chat_turn_new() {
        let turn = ChatTurn::new("user-1", "Hello", "Hi");
        assert_eq!(turn.user_id, "user-1");
        assert_eq!(turn.message, "Hello");
        assert_eq!(turn.response, "Hi");
        assert!(turn.id.is_none());
    }

    #[test]
    fn test_equality_ignores_store_id() {
        let now = Utc::now();
        let a = ChatTurn::new("user-1", "Hello", "Hi").with_timestamp(now);
        let b = a.clone().with_id(42);
        assert_eq!(a, b);
    }

    #[test]
    fn test_equality_respects_timestamp() {
        let now = Utc::now();
        let a = ChatTurn::new("user-1", "Hello", "Hi").with_timestamp(now);
        let b = a.clone().with_timestamp(now + Duration::seconds(1));
        assert_ne!(a, b);
    }

    #[test]
    fn test_timestamps_truncated_to_microseconds() {
        let turn = ChatTurn::new("user-1", "Hello", "Hi");
        assert_eq!(turn.timestamp.timestamp_subsec_nanos() % 1_000, 0);

        let precise = Utc.timestamp_opt(1_700_000_000, 474_530_043).unwrap();
        let turn = turn.with_timestamp(precise);
        assert_eq!(turn.timestamp.timestamp_subsec_nanos(), 474_530_000);
    }

    #[test]
    fn test_serialization_skips_missing_id() {
        let turn = ChatTurn::new("user-1", "Hello", "Hi");
        let value = serde_json::to_value(&turn).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["user_id"], "user-1");
        assert_eq!(value["response"], "Hi");
    }
}

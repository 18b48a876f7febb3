use axum::extract::ws::Utf8Bytes;
use chrono::{SecondsFormat, Utc};
use domain::PartialResult;
use events::EventId;
use serde::{Deserialize, Serialize};

/// The frame pushed to every subscriber at the end of a round:
/// `{"event": ..., "data": {...}, "timestamp": "<RFC 3339>"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    event: EventId,
    data: PartialResult,
    timestamp: String,
}

impl OutgoingMessage {
    pub fn new(event: EventId, data: PartialResult) -> Self {
        Self {
            event,
            data,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    pub fn event(&self) -> &EventId {
        &self.event
    }

    #[cfg(test)]
    fn data(&self) -> &PartialResult {
        &self.data
    }

    /// Serializes into a text frame. The frame is reference counted, so one
    /// encoding is shared by every delivery of the round.
    pub fn encode(&self) -> Result<Utf8Bytes, serde_json::Error> {
        serde_json::to_string(self).map(Utf8Bytes::from)
    }
}

//! Messages delivered to topic handlers

use bytes::Bytes;

use crate::topic::Topic;

/// Length of a message sequence number in bytes
pub const SEQNO_LEN: usize = 20;

/// A message published on one or more topics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Identity of the publishing node
    pub from: String,
    /// Message payload
    pub data: Bytes,
    /// Random sequence number assigned by the publisher
    pub seqno: [u8; SEQNO_LEN],
    /// Topics the message was published on
    pub topics: Vec<Topic>,
}

impl Message {
    /// Create a message for a single topic with a fresh sequence number
    pub fn new(from: impl Into<String>, topic: impl Into<Topic>, data: impl Into<Bytes>) -> Self {
        Self {
            from: from.into(),
            data: data.into(),
            seqno: random_seqno(),
            topics: vec![topic.into()],
        }
    }

    /// Sequence number as lowercase hex (40 characters)
    pub fn seqno_hex(&self) -> String {
        hex::encode(self.seqno)
    }

    /// Identifier unique per publisher and sequence number
    pub fn id(&self) -> String {
        format!("{}{}", self.from, self.seqno_hex())
    }
}

/// Generate a random sequence number
pub fn random_seqno() -> [u8; SEQNO_LEN] {
    rand::random()
}

//! Signed message encoding for gossip broadcast
//!
//! Messages are signed to ensure authenticity and prevent spoofing.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use floodgate_core::{Message, SEQNO_LEN, Topic};
use iroh::{PublicKey, SecretKey, Signature};
use serde::{Deserialize, Serialize};

use crate::error::{GossipError, GossipResult};

/// A signed message ready for gossip broadcast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedMessage {
    /// Public key of the sender
    pub from: PublicKey,
    /// Serialized [`WireMessage`]
    pub data: Vec<u8>,
    /// Signature over the data
    pub signature: Signature,
}

impl SignedMessage {
    /// Sign and encode a message for broadcast
    ///
    /// The message's `from` field is not sent; receivers take the sender
    /// identity from the signing key.
    pub fn sign_and_encode(secret_key: &SecretKey, message: &Message) -> GossipResult<Vec<u8>> {
        Self::seal(
            secret_key,
            &WireMessage::V0 {
                timestamp: now_micros(),
                seqno: message.seqno,
                topics: message.topics.clone(),
                payload: message.data.to_vec(),
            },
        )
    }

    /// Sign and encode an interest announcement for a topic
    pub fn sign_interest(
        secret_key: &SecretKey,
        topic: &Topic,
        announced: bool,
    ) -> GossipResult<Vec<u8>> {
        Self::seal(
            secret_key,
            &WireMessage::Interest {
                timestamp: now_micros(),
                topic: topic.clone(),
                announced,
            },
        )
    }

    fn seal(secret_key: &SecretKey, wire_message: &WireMessage) -> GossipResult<Vec<u8>> {
        let data = postcard::to_allocvec(wire_message)?;
        let signature = secret_key.sign(&data);
        let from = secret_key.public();

        let signed = SignedMessage {
            from,
            data,
            signature,
        };

        postcard::to_allocvec(&signed).map_err(Into::into)
    }

    /// Verify signature and decode whatever the envelope carries
    pub fn open(bytes: &[u8]) -> GossipResult<Envelope> {
        let signed: SignedMessage =
            postcard::from_bytes(bytes).map_err(|e| GossipError::DecodeFailed(e.to_string()))?;

        signed
            .from
            .verify(&signed.data, &signed.signature)
            .map_err(|e| GossipError::SignatureVerificationFailed(e.to_string()))?;

        let wire_message: WireMessage = postcard::from_bytes(&signed.data)
            .map_err(|e| GossipError::DecodeFailed(e.to_string()))?;

        Ok(match wire_message {
            WireMessage::V0 {
                timestamp,
                seqno,
                topics,
                payload,
            } => Envelope::Message(ReceivedMessage {
                from: signed.from,
                timestamp,
                message: Message {
                    from: signed.from.to_string(),
                    data: Bytes::from(payload),
                    seqno,
                    topics,
                },
            }),
            WireMessage::Interest {
                timestamp,
                topic,
                announced,
            } => Envelope::Interest(InterestAnnouncement {
                from: signed.from,
                timestamp,
                topic,
                announced,
            }),
        })
    }

    /// Verify signature and decode a data message
    pub fn verify_and_decode(bytes: &[u8]) -> GossipResult<ReceivedMessage> {
        match Self::open(bytes)? {
            Envelope::Message(received) => Ok(received),
            Envelope::Interest(_) => Err(GossipError::DecodeFailed(
                "expected a data message, got an interest announcement".to_string(),
            )),
        }
    }
}

fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}

/// Wire format for gossip messages (versioned for future compatibility)
#[derive(Debug, Serialize, Deserialize)]
pub enum WireMessage {
    /// Version 0 format
    V0 {
        /// Timestamp in microseconds since UNIX epoch
        timestamp: u64,
        /// Publisher-assigned sequence number
        seqno: [u8; SEQNO_LEN],
        /// Topics the message was published on
        topics: Vec<Topic>,
        /// Application payload
        payload: Vec<u8>,
    },
    /// The sender gained or dropped local handlers for a topic
    ///
    /// Sent to direct neighbors only.
    Interest {
        /// Timestamp in microseconds since UNIX epoch
        timestamp: u64,
        /// Topic the announcement is about
        topic: Topic,
        /// `true` when subscribing, `false` when leaving
        announced: bool,
    },
}

/// Verified contents of a signed envelope
#[derive(Debug, Clone)]
pub enum Envelope {
    /// A published message
    Message(ReceivedMessage),
    /// A topic interest announcement
    Interest(InterestAnnouncement),
}

/// A verified topic interest announcement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterestAnnouncement {
    /// Public key of the announcing peer
    pub from: PublicKey,
    /// Timestamp when the announcement was sent (microseconds since UNIX epoch)
    pub timestamp: u64,
    /// Topic the announcement is about
    pub topic: Topic,
    /// Whether the peer is now interested in the topic
    pub announced: bool,
}

/// A received and verified message
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    /// Public key of the sender
    pub from: PublicKey,
    /// Timestamp when the message was sent (microseconds since UNIX epoch)
    pub timestamp: u64,
    /// The message as delivered to handlers
    pub message: Message,
}

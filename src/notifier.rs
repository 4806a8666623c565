//! Outbound delivery of challenge secrets.
//!
//! SMS and email transport live outside this crate; the engine only depends
//! on the [`Notifier`] capability. Delivery failures surface to the caller of
//! the send operation and never affect sessions that are already issued.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use tracing::info;

/// Where a challenge secret should be sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Destination {
    Sms(String),
    Email(String),
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sms(phone) => write!(f, "sms:{phone}"),
            Self::Email(email) => write!(f, "email:{email}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryPayload {
    OtpCode { code: String },
    MagicLink { url: String },
}

#[derive(Debug, Error)]
#[error("delivery to {destination} failed: {reason}")]
pub struct DeliveryError {
    pub destination: String,
    pub reason: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(
        &self,
        destination: &Destination,
        payload: &DeliveryPayload,
    ) -> Result<(), DeliveryError>;
}

/// Records delivery in the log instead of sending anything.
///
/// Stands in wherever no SMS/email transport is wired; the secret itself is
/// never written to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(
        &self,
        destination: &Destination,
        payload: &DeliveryPayload,
    ) -> Result<(), DeliveryError> {
        match payload {
            DeliveryPayload::OtpCode { .. } => {
                info!(destination = %destination, "one-time code issued");
            }
            DeliveryPayload::MagicLink { .. } => {
                info!(destination = %destination, "magic link issued");
            }
        }
        Ok(())
    }
}

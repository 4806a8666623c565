//! Server-side one-time-passcode challenges, keyed by phone number.
//!
//! Only a digest of the issued code is held, never the code itself, and a
//! challenge is taken out of the map on its first confirmation attempt; a
//! mismatch burns the code and the caller must request a new one.

use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, Rng};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use time::OffsetDateTime;
use tokio::sync::Mutex;

pub(crate) const OTP_CODE_LEN: usize = 6;

#[derive(Debug)]
struct OtpChallenge {
    code_digest: String,
    expires_at: i64,
}

/// Why a confirmation attempt did not consume its challenge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChallengeFailure {
    /// No outstanding challenge, or the code does not match it.
    Invalid,
    Expired,
}

/// Outstanding OTP challenges, one per phone number.
pub struct OtpChallengeStore {
    ttl_seconds: i64,
    challenges: Mutex<HashMap<String, OtpChallenge>>,
}

impl OtpChallengeStore {
    #[must_use]
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            ttl_seconds,
            challenges: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a fresh code for `phone`, replacing any outstanding challenge.
    ///
    /// The returned code goes to the notifier only; it is never echoed to the
    /// requesting caller.
    pub async fn issue(&self, phone: &str, now: OffsetDateTime) -> String {
        let code = generate_code();
        let now_unix = now.unix_timestamp();
        let mut challenges = self.challenges.lock().await;
        // Sweep expired entries so abandoned requests do not accumulate.
        challenges.retain(|_, challenge| challenge.expires_at > now_unix);
        challenges.insert(
            phone.to_string(),
            OtpChallenge {
                code_digest: digest_code(&code),
                expires_at: now_unix + self.ttl_seconds,
            },
        );
        code
    }

    /// Take the outstanding challenge for `phone` and compare digests.
    ///
    /// The entry is removed whether or not the code matches.
    pub async fn consume(
        &self,
        phone: &str,
        code: &str,
        now: OffsetDateTime,
    ) -> Result<(), ChallengeFailure> {
        let challenge = {
            let mut challenges = self.challenges.lock().await;
            challenges.remove(phone)
        };
        let Some(challenge) = challenge else {
            return Err(ChallengeFailure::Invalid);
        };
        if challenge.expires_at <= now.unix_timestamp() {
            return Err(ChallengeFailure::Expired);
        }
        if digest_code(code) != challenge.code_digest {
            return Err(ChallengeFailure::Invalid);
        }
        Ok(())
    }
}

fn generate_code() -> String {
    format!("{:06}", OsRng.gen_range(0..1_000_000_u32))
}

fn digest_code(code: &str) -> String {
    let digest = Sha256::digest(code.as_bytes());
    Base64UrlUnpadded::encode_string(digest.as_slice())
}

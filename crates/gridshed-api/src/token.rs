// Cloud bearer token model.
//
// The identity service (and the persisted store) reports `generation_time`
// and `expires_at` as strings *or* numbers; both must coerce to integer
// epoch seconds. Coercion failures are parse errors, never a `false`
// validity result — an expired token and a malformed one are different
// things and are handled at different layers.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A bearer token issued by the cloud identity service.
///
/// Replaced wholesale on renewal, never mutated in place. The parse step
/// enforces `generation_time <= expires_at`, so a constructed token always
/// has a coherent validity window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCloudToken")]
pub struct CloudToken {
    pub token: String,
    /// Issue time, epoch seconds.
    pub generation_time: i64,
    /// Expiry time, epoch seconds.
    pub expires_at: i64,
}

impl CloudToken {
    /// Parse a token from a JSON response body.
    ///
    /// Fails with [`Error::TokenFormat`] on a missing field, a timestamp
    /// that does not coerce to an integer, or an inverted window.
    pub fn parse(body: &str) -> Result<Self, Error> {
        serde_json::from_str(body).map_err(|e| Error::TokenFormat {
            message: e.to_string(),
        })
    }

    /// Pure, boundary-inclusive validity check:
    /// `generation_time <= now <= expires_at`.
    pub fn is_valid(&self, now: i64) -> bool {
        self.generation_time <= now && now <= self.expires_at
    }

    /// [`is_valid`](Self::is_valid) against the wall clock.
    pub fn is_valid_now(&self) -> bool {
        self.is_valid(chrono::Utc::now().timestamp())
    }

    /// Human-readable description of the validity window.
    pub fn validity_window(&self) -> String {
        let render = |secs: i64| {
            DateTime::from_timestamp(secs, 0)
                .map_or_else(|| format!("@{secs}"), |dt| dt.to_rfc3339())
        };
        let days = (self.expires_at - self.generation_time) / 86_400;
        format!(
            "valid from {} to {} ({days} days)",
            render(self.generation_time),
            render(self.expires_at),
        )
    }
}

// ── Wire format ─────────────────────────────────────────────────────

/// Epoch-seconds field that the wire (and the store) may encode as a
/// JSON number or a decimal string.
#[derive(Deserialize)]
#[serde(untagged)]
enum EpochSeconds {
    Number(i64),
    Text(String),
}

impl EpochSeconds {
    fn coerce(self, field: &str) -> Result<i64, String> {
        match self {
            Self::Number(n) => Ok(n),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| format!("`{field}` is not an integer: {s:?}")),
        }
    }
}

#[derive(Deserialize)]
struct RawCloudToken {
    token: String,
    generation_time: EpochSeconds,
    expires_at: EpochSeconds,
}

impl TryFrom<RawCloudToken> for CloudToken {
    type Error = String;

    fn try_from(raw: RawCloudToken) -> Result<Self, String> {
        let generation_time = raw.generation_time.coerce("generation_time")?;
        let expires_at = raw.expires_at.coerce("expires_at")?;
        if generation_time > expires_at {
            return Err(format!(
                "validity window is inverted: generation_time {generation_time} > expires_at {expires_at}"
            ));
        }
        Ok(Self {
            token: raw.token,
            generation_time,
            expires_at,
        })
    }
}

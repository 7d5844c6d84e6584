use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionRequest {
    pub token: String,
    pub email: String,
    pub reason: String,
    pub reason_text: String,
    #[serde(default)]
    pub feedback: String,
    pub created_at: SystemTime,
    pub confirmed: bool,
    #[serde(default)]
    pub confirmed_at: Option<SystemTime>,
}

impl DeletionRequest {
    /// Confirmed requests never expire. A `created_at` in the future (clock skew) counts
    /// as zero age.
    pub fn is_expired(&self, now: SystemTime, expiry_window: Duration) -> bool {
        if self.confirmed {
            return false;
        }

        let age = now
            .duration_since(self.created_at)
            .unwrap_or(Duration::from_nanos(0));

        age > expiry_window
    }

    pub fn is_active(&self, now: SystemTime, expiry_window: Duration) -> bool {
        !self.confirmed && !self.is_expired(now, expiry_window)
    }

    pub fn belongs_to(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email)
    }
}

#[derive(Debug)]
pub struct NewDeletionRequest<'a> {
    pub email: &'a str,
    pub reason: &'a str,
    pub feedback: &'a str,
}

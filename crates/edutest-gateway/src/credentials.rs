//! Explicit credentials for the HTTP gateway.
//!
//! Tokens live in a value owned by the gateway instead of ambient storage.
//! An access token may carry an expiry; with a refresh token available the
//! gateway renews it before it lapses.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Seconds before expiry at which a token is already treated as expired.
pub const EXPIRY_SKEW_SECS: i64 = 30;

/// Bearer credentials for the portal API.
///
/// Note: Custom Debug impl masks tokens to prevent accidental exposure in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"***")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Body of a successful `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the new access token in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Whether the access token should be considered lapsed at `now`.
    /// Tokens without an expiry never lapse on the client side.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|exp| now + Duration::seconds(EXPIRY_SKEW_SECS) >= exp)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Install the tokens from a refresh response. A missing refresh token in
    /// the response keeps the current one.
    ///
    /// A lifetime too large to represent as a timestamp is treated as no
    /// expiry; the server still rejects the token with a 401 once it lapses.
    pub fn apply_refresh(&mut self, response: RefreshResponse, now: DateTime<Utc>) {
        self.access_token = response.access_token;
        if let Some(refresh) = response.refresh_token {
            self.refresh_token = Some(refresh);
        }
        self.expires_at = response.expires_in.and_then(|secs| {
            let expiry = Duration::try_seconds(secs).and_then(|d| now.checked_add_signed(d));
            if expiry.is_none() {
                tracing::debug!(expires_in = secs, "token lifetime out of range, ignoring expiry");
            }
            expiry
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn debug_masks_tokens() {
        let creds = Credentials::new("secret-access").with_refresh_token("secret-refresh");
        let debug = format!("{creds:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn expiry_uses_skew() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let creds = Credentials::new("t").with_expiry(now + Duration::seconds(10));
        assert!(creds.is_expired_at(now));

        let creds = Credentials::new("t").with_expiry(now + Duration::minutes(5));
        assert!(!creds.is_expired_at(now));

        assert!(!Credentials::new("t").is_expired_at(now));
    }

    #[test]
    fn apply_refresh_keeps_refresh_token_when_absent() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let mut creds = Credentials::new("old").with_refresh_token("r1");
        creds.apply_refresh(
            RefreshResponse {
                access_token: "new".into(),
                refresh_token: None,
                expires_in: Some(600),
            },
            now,
        );
        assert_eq!(creds.access_token, "new");
        assert_eq!(creds.refresh_token.as_deref(), Some("r1"));
        assert_eq!(creds.expires_at, Some(now + Duration::seconds(600)));
    }

    #[test]
    fn out_of_range_lifetime_means_no_expiry() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        for expires_in in [i64::MAX, i64::MIN, i64::MAX / 1000] {
            let mut creds = Credentials::new("old").with_expiry(now);
            creds.apply_refresh(
                RefreshResponse {
                    access_token: "new".into(),
                    refresh_token: None,
                    expires_in: Some(expires_in),
                },
                now,
            );
            assert_eq!(creds.access_token, "new");
            assert_eq!(creds.expires_at, None, "expires_in = {expires_in}");
            assert!(!creds.is_expired_at(now));
        }
    }
}

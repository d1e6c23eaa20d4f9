//! Access token minting
//!
//! A successful payment mints an opaque access token for the buyer. Tokens
//! are 32 random bytes hex-encoded, with a lifetime set by the delivery
//! channel: site viewing is short-lived, telegram delivery lives longer so
//! the deep link survives a slow bot conversation.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

use crate::constants::ACCESS_TOKEN_BYTES;
use crate::models::DeliveryChannel;

/// A freshly minted access token and its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Per-channel token lifetimes, taken from config at startup.
#[derive(Debug, Clone, Copy)]
pub struct AccessPolicy {
    pub site_ttl_hours: i64,
    pub telegram_ttl_days: i64,
}

impl AccessPolicy {
    pub fn ttl_for(&self, channel: DeliveryChannel) -> Duration {
        match channel {
            DeliveryChannel::Site => Duration::hours(self.site_ttl_hours),
            DeliveryChannel::Telegram => Duration::days(self.telegram_ttl_days),
        }
    }

    pub fn mint(&self, channel: DeliveryChannel, now: DateTime<Utc>) -> AccessGrant {
        let mut bytes = [0u8; ACCESS_TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        AccessGrant {
            token: hex::encode(bytes),
            expires_at: now + self.ttl_for(channel),
        }
    }
}

/// Deep link that opens the Telegram bot with a start payload preloaded:
/// the purchase token while the purchase is open, the access token once it
/// is paid.
pub fn telegram_deep_link(bot_username: &str, start_payload: &str) -> String {
    format!("https://t.me/{}?start={}", bot_username, start_payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> AccessPolicy {
        AccessPolicy {
            site_ttl_hours: 24,
            telegram_ttl_days: 30,
        }
    }

    #[test]
    fn test_token_is_64_hex_chars() {
        let grant = policy().mint(DeliveryChannel::Site, Utc::now());
        assert_eq!(grant.token.len(), ACCESS_TOKEN_BYTES * 2);
        assert!(grant.token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_tokens_are_unique() {
        let p = policy();
        let now = Utc::now();
        let a = p.mint(DeliveryChannel::Site, now);
        let b = p.mint(DeliveryChannel::Site, now);
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn test_ttl_follows_channel() {
        let p = policy();
        let now = Utc::now();
        let site = p.mint(DeliveryChannel::Site, now);
        let telegram = p.mint(DeliveryChannel::Telegram, now);
        assert_eq!(site.expires_at, now + Duration::hours(24));
        assert_eq!(telegram.expires_at, now + Duration::days(30));
    }

    #[test]
    fn test_telegram_deep_link_format() {
        let purchase_token = uuid::Uuid::new_v4();
        let link = telegram_deep_link("cinevision_bot", &purchase_token.to_string());
        assert_eq!(
            link,
            format!("https://t.me/cinevision_bot?start={}", purchase_token)
        );

        let grant = policy().mint(DeliveryChannel::Telegram, Utc::now());
        let link = telegram_deep_link("cinevision_bot", &grant.token);
        assert_eq!(
            link,
            format!("https://t.me/cinevision_bot?start={}", grant.token)
        );
    }
}

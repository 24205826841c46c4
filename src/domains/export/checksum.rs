use sha2::{Digest, Sha256};

/// Default validity of a contact checksum, in hours
pub const DEFAULT_CHECKSUM_LIVE_HOURS: u32 = 7 * 24;

/// Produces the per-contact hash exported as `Kontakt-Hash`
pub trait ChecksumGenerator: Send + Sync {
    fn checksum(&self, contact_id: i64, contact_hash: Option<&str>) -> String;
}

/// Time-limited contact checksum rendered as `<sha256 hex>_<issued_at>_<live_hours>`.
///
/// The digest covers the site key, the contact's stored hash, its id, the
/// issue timestamp and the lifetime.
#[derive(Debug, Clone)]
pub struct ContactChecksum {
    site_key: String,
    issued_at: i64,
    live_hours: u32,
}

impl ContactChecksum {
    pub fn new(site_key: impl Into<String>, issued_at: i64, live_hours: u32) -> Self {
        Self {
            site_key: site_key.into(),
            issued_at,
            live_hours,
        }
    }
}

impl ChecksumGenerator for ContactChecksum {
    fn checksum(&self, contact_id: i64, contact_hash: Option<&str>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.site_key.as_bytes());
        hasher.update(contact_hash.unwrap_or_default().as_bytes());
        hasher.update(contact_id.to_string().as_bytes());
        hasher.update(self.issued_at.to_string().as_bytes());
        hasher.update(self.live_hours.to_string().as_bytes());
        let digest = hex::encode(hasher.finalize());
        format!("{}_{}_{}", digest, self.issued_at, self.live_hours)
    }
}

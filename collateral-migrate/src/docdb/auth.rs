//! Master-key request signing for the document database REST API

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signs requests with the account master key
#[derive(Clone)]
pub struct MasterKeySigner {
    key: Vec<u8>,
}

impl std::fmt::Debug for MasterKeySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKeySigner").finish_non_exhaustive()
    }
}

/// RFC 1123 date as the `x-ms-date` header expects it
pub fn rfc1123(date: DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

impl MasterKeySigner {
    /// Build a signer from the base64-encoded master key
    pub fn new(master_key: &str) -> Result<Self> {
        let key = BASE64
            .decode(master_key.trim())
            .context("Document database key is not valid base64")?;
        Ok(Self { key })
    }

    /// Value for the `Authorization` header.
    ///
    /// `resource_type` is e.g. `docs`; `resource_link` is the owning resource
    /// path without a leading slash (`dbs/app/colls/promotions` for a query,
    /// `dbs/app/colls/promotions/docs/<id>` for a single document).
    pub fn authorization(
        &self,
        verb: &str,
        resource_type: &str,
        resource_link: &str,
        date: &str,
    ) -> Result<String> {
        let payload = format!(
            "{}\n{}\n{}\n{}\n\n",
            verb.to_lowercase(),
            resource_type.to_lowercase(),
            resource_link,
            date.to_lowercase()
        );

        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|_| anyhow::anyhow!("Invalid HMAC key length"))?;
        mac.update(payload.as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());

        let token = format!("type=master&ver=1.0&sig={}", signature);
        Ok(urlencoding::encode(&token).into_owned())
    }
}

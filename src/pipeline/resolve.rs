//! Resource resolution: turn a payload into image bytes.
//!
//! The only stage with network I/O. Each payload is joined onto a fixed base
//! URL and fetched with a single GET. There is no retry: a transport error or
//! a non-success status becomes [`BookpatchError::FetchFailed`] and aborts the
//! run, because a half-rewritten document with dangling image references is
//! worse than no output at all.
//!
//! Resolution sits behind the [`ResourceResolver`] trait so the rewriting
//! core can be driven by something other than HTTP (tests use an in-memory
//! table).

use crate::error::BookpatchError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// How a captured payload is decoded before it is appended to the base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PayloadDecoding {
    /// Use the payload verbatim (inline TeX source).
    #[default]
    Raw,
    /// Undo XML entity escaping, then `+`-as-space and percent-encoding
    /// (URLs lifted out of XHTML attributes).
    EntitiesAndPercent,
}

impl PayloadDecoding {
    pub fn apply(&self, payload: &str) -> String {
        match self {
            PayloadDecoding::Raw => payload.to_string(),
            PayloadDecoding::EntitiesAndPercent => unquote_plus(&unescape_entities(payload)),
        }
    }
}

/// Bytes of a fetched resource plus the locator it was fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub locator: String,
    pub bytes: Vec<u8>,
}

/// Produces the bytes a payload refers to.
#[allow(async_fn_in_trait)]
pub trait ResourceResolver {
    async fn resolve(&self, payload: &str) -> Result<Resource, BookpatchError>;
}

/// Fetches `base_url + decode(payload)` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpResolver {
    client: reqwest::Client,
    base_url: String,
    decoding: PayloadDecoding,
    timeout_secs: u64,
}

impl HttpResolver {
    pub fn new(
        base_url: impl Into<String>,
        decoding: PayloadDecoding,
        timeout_secs: u64,
    ) -> Result<Self, BookpatchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| BookpatchError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            decoding,
            timeout_secs,
        })
    }

    /// The full URL a payload resolves to.
    pub fn locate(&self, payload: &str) -> String {
        format!("{}{}", self.base_url, self.decoding.apply(payload))
    }
}

impl ResourceResolver for HttpResolver {
    async fn resolve(&self, payload: &str) -> Result<Resource, BookpatchError> {
        let url = self.locate(payload);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                BookpatchError::FetchTimeout {
                    url: url.clone(),
                    secs: self.timeout_secs,
                }
            } else {
                BookpatchError::FetchFailed {
                    url: url.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        if !response.status().is_success() {
            return Err(BookpatchError::FetchFailed {
                url,
                reason: format!("HTTP {}", response.status()),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BookpatchError::FetchFailed {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        debug!("{} → {} bytes", url, bytes.len());
        Ok(Resource {
            locator: url,
            bytes: bytes.to_vec(),
        })
    }
}

/// Undo the five predefined XML entities. `&amp;` goes last so `&amp;lt;`
/// decodes to `&lt;`, not `<`.
pub fn unescape_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Form-style unquoting: `+` becomes a space, then `%XX` sequences are
/// decoded. Invalid UTF-8 after decoding is replaced, not rejected.
pub fn unquote_plus(s: &str) -> String {
    let spaced = s.replace('+', " ");
    let decoded = urlencoding::decode_binary(spaced.as_bytes());
    String::from_utf8_lossy(&decoded).into_owned()
}

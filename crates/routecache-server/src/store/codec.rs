//! Encoding of cached responses into store values.

use std::sync::Arc;

use super::{CachedResponse, StoreError};

/// Turns a [`CachedResponse`] into the string a store keeps, and back.
///
/// The HTTP subscriber encodes on a miss and decodes on a hit. A value the
/// codec cannot decode is treated as a miss.
///
/// # Examples
///
/// ```
/// use routecache_server::store::{CachedResponse, ResponseCodec, StoreError};
///
/// /// Keeps only the status and the body, separated by a newline.
/// struct PlainCodec;
///
/// impl ResponseCodec for PlainCodec {
///     fn encode(&self, response: &CachedResponse) -> Result<String, StoreError> {
///         Ok(format!("{}\n{}", response.status, response.body))
///     }
///
///     fn decode(&self, raw: &str) -> Result<CachedResponse, StoreError> {
///         let (status, body) = raw
///             .split_once('\n')
///             .ok_or_else(|| StoreError::codec("missing status line"))?;
///         let status = status
///             .parse()
///             .map_err(|_| StoreError::codec(format!("bad status {status}")))?;
///         Ok(CachedResponse::new(status, body))
///     }
/// }
///
/// let codec = PlainCodec;
/// let raw = codec.encode(&CachedResponse::new(200, "hello")).unwrap();
/// assert_eq!(raw, "200\nhello");
/// assert_eq!(codec.decode(&raw).unwrap().body, "hello");
/// ```
pub trait ResponseCodec: Send + Sync {
    fn encode(&self, response: &CachedResponse) -> Result<String, StoreError>;

    fn decode(&self, raw: &str) -> Result<CachedResponse, StoreError>;

    /// Codec name, used in logs.
    fn name(&self) -> &str {
        "custom"
    }
}

/// Shared handle to the codec a service uses.
pub type SharedCodec = Arc<dyn ResponseCodec>;

/// Stores the whole envelope as JSON. The default codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl ResponseCodec for JsonCodec {
    fn encode(&self, response: &CachedResponse) -> Result<String, StoreError> {
        response.encode()
    }

    fn decode(&self, raw: &str) -> Result<CachedResponse, StoreError> {
        CachedResponse::decode(raw)
    }

    fn name(&self) -> &str {
        "json"
    }
}

//! Client IP resolution from request transport metadata.
//!
//! The resolver walks a configured, ordered list of metadata keys and
//! returns the value of the first key that is PRESENT, whatever that value
//! is. Presence decides, not truthiness: a present empty or zero value is
//! still the host's answer for that header and must not be confused with
//! "no header at all".

use std::collections::HashMap;

/// Resolves the client IP from request metadata by header priority.
#[derive(Debug, Clone)]
pub struct RemoteIpResolver {
    /// Metadata keys to try, in order.
    headers: Vec<String>,
}

impl RemoteIpResolver {
    /// Create a resolver with the given header priority list.
    #[must_use]
    pub fn new(headers: Vec<String>) -> Self {
        Self { headers }
    }

    /// Return the value of the first configured header present in the
    /// metadata, or `None` if no configured header is a present key.
    #[must_use]
    pub fn resolve<'a>(&self, metadata: &'a HashMap<String, String>) -> Option<&'a str> {
        self.headers
            .iter()
            .find_map(|name| metadata.get(name).map(String::as_str))
    }

    /// The configured header priority list.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

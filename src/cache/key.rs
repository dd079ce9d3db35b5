//! Request fingerprints.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::request::Method;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub hash: String,
}

impl CacheKey {
    pub fn new(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }

    /// SHA-256 over the canonical JSON form of method, URL and query.
    ///
    /// Query order does not matter; repeated keys keep their relative order.
    pub fn fingerprint(method: Method, url: &str, query: &[(String, String)]) -> Self {
        let mut params: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (k, v) in query {
            params.entry(k.as_str()).or_default().push(v.as_str());
        }
        let canonical = serde_json::json!({
            "method": method.as_str(),
            "url": url,
            "query": params,
        });
        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string().as_bytes());
        let hash: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        Self::new(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_fingerprint_ignores_param_order() {
        let a = CacheKey::fingerprint(Method::Get, "http://x/a", &q(&[("a", "1"), ("b", "2")]));
        let b = CacheKey::fingerprint(Method::Get, "http://x/a", &q(&[("b", "2"), ("a", "1")]));
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_fingerprint_distinguishes_requests() {
        let base = CacheKey::fingerprint(Method::Get, "http://x/a", &[]);
        assert_ne!(base, CacheKey::fingerprint(Method::Delete, "http://x/a", &[]));
        assert_ne!(base, CacheKey::fingerprint(Method::Get, "http://x/b", &[]));
        assert_ne!(
            base,
            CacheKey::fingerprint(Method::Get, "http://x/a", &q(&[("page", "2")]))
        );
    }
}

//! Logical identity and fingerprint of credentials.
//!
//! The identity is whatever the method codec reports as canonical for some
//! content. The fingerprint hashes method kind and identity together and names
//! a credential independently of its storage id, before it is ever saved.

use crate::auth::{AuthMethod, MethodRegistry};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `method_kind || identity`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(method_kind: &str, identity: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(method_kind.as_bytes());
        hasher.update(identity.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.0
    }
}

/// Resolves identities through the registered codecs.
#[derive(Debug, Clone, Copy)]
pub struct IdentityResolver<'a> {
    methods: &'a MethodRegistry,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(methods: &'a MethodRegistry) -> Self {
        Self { methods }
    }

    /// Decode content and return the codec together with its identity
    pub fn decode(&self, method_kind: &str, content: &str) -> Result<(Box<dyn AuthMethod>, String)> {
        let codec = self.methods.decode(method_kind, content)?;
        let identity = codec.identifier().to_string();
        Ok((codec, identity))
    }

    /// Canonical identity of `content` under `method_kind`.
    ///
    /// Fails with `UnknownMethod` when no codec is registered for the kind and
    /// with `MalformedContent` when the codec rejects the content.
    pub fn resolve_identity(&self, method_kind: &str, content: &str) -> Result<String> {
        self.decode(method_kind, content).map(|(_, identity)| identity)
    }

    pub fn compute_fingerprint(&self, method_kind: &str, content: &str) -> Result<Fingerprint> {
        let identity = self.resolve_identity(method_kind, content)?;
        Ok(Fingerprint::of(method_kind, &identity))
    }
}

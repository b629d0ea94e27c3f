//! Lookup table from method kind to codec factory.

use super::{AuthMethod, MethodContext, NtHash, Password, PrivateKey};
use crate::error::{CredsError, Result};
use std::collections::BTreeMap;

/// Builds a codec from serialized content.
pub type MethodFactory = fn(&str, &MethodContext) -> Result<Box<dyn AuthMethod>>;

/// Registered authentication methods, keyed by kind.
///
/// Filled once when a workspace is opened; resolution of an unregistered kind
/// fails with [`CredsError::UnknownMethod`].
#[derive(Debug, Clone)]
pub struct MethodRegistry {
    methods: BTreeMap<String, MethodFactory>,
    context: MethodContext,
}

impl MethodRegistry {
    /// Empty registry
    pub fn new(context: MethodContext) -> Self {
        Self {
            methods: BTreeMap::new(),
            context,
        }
    }

    /// Registry with the built-in methods registered
    pub fn with_builtin(context: MethodContext) -> Self {
        let mut registry = Self::new(context);
        registry.register(Password::KIND, decode_password);
        registry.register(PrivateKey::KIND, decode_privkey);
        registry.register(NtHash::KIND, decode_nthash);
        registry
    }

    /// Register (or replace) the factory for a method kind
    pub fn register(&mut self, kind: &str, factory: MethodFactory) {
        if self.methods.insert(kind.to_string(), factory).is_some() {
            tracing::debug!("Replaced auth method '{}'", kind);
        }
    }

    pub fn resolve(&self, kind: &str) -> Result<MethodFactory> {
        self.methods
            .get(kind)
            .copied()
            .ok_or_else(|| CredsError::UnknownMethod(kind.to_string()))
    }

    /// Build the codec for `kind` from serialized content
    pub fn decode(&self, kind: &str, content: &str) -> Result<Box<dyn AuthMethod>> {
        let factory = self.resolve(kind)?;
        factory(content, &self.context)
    }

    /// Registered kinds in sorted order
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn context(&self) -> &MethodContext {
        &self.context
    }
}

fn decode_password(content: &str, _ctx: &MethodContext) -> Result<Box<dyn AuthMethod>> {
    Ok(Box::new(Password::parse(content)?))
}

fn decode_privkey(content: &str, ctx: &MethodContext) -> Result<Box<dyn AuthMethod>> {
    Ok(Box::new(PrivateKey::parse(content, ctx)?))
}

fn decode_nthash(content: &str, _ctx: &MethodContext) -> Result<Box<dyn AuthMethod>> {
    Ok(Box::new(NtHash::parse(content)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_kinds() {
        let registry = MethodRegistry::with_builtin(MethodContext::new("/tmp"));
        let kinds: Vec<&str> = registry.kinds().collect();
        assert_eq!(kinds, vec!["nthash", "password", "privkey"]);
    }

    #[test]
    fn test_unknown_method() {
        let registry = MethodRegistry::with_builtin(MethodContext::new("/tmp"));
        let err = registry.decode("kerberos", "ticket").unwrap_err();
        assert!(matches!(err, CredsError::UnknownMethod(ref k) if k == "kerberos"));
    }

    #[test]
    fn test_register_custom_method() {
        let mut registry = MethodRegistry::new(MethodContext::new("/tmp"));
        assert!(registry.decode("password", "root:toor").is_err());

        registry.register("password", decode_password);
        let codec = registry.decode("password", "root:toor").unwrap();
        assert_eq!(codec.identifier(), "root");
    }
}

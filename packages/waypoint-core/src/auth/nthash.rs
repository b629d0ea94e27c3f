//! NT hash authentication (`user:<32 hex digits>`), for pass-the-hash.
//!
//! An account has one NT hash at a time, so the identity is the user name
//! alone, lowercased since NTLM user names are case-insensitive. A new hash
//! for a known user updates the stored credentials.

use super::{split_user_secret, AuthMethod, ConnectionParams, FieldEdits, MethodContext};
use crate::error::{CredsError, Result};

const NT_HASH_LEN: usize = 32;

#[derive(Clone)]
pub struct NtHash {
    user: String,
    hash: String,
    identity: String,
}

impl NtHash {
    pub const KIND: &'static str = "nthash";

    pub fn parse(content: &str) -> Result<Self> {
        let (user, hash) = split_user_secret(Self::KIND, content)?;
        Self::build(user, hash)
    }

    fn build(user: &str, hash: &str) -> Result<Self> {
        if hash.len() != NT_HASH_LEN || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CredsError::malformed(
                Self::KIND,
                format!("hash must be {} hex digits", NT_HASH_LEN),
            ));
        }
        Ok(Self {
            user: user.to_string(),
            hash: hash.to_string(),
            identity: user.to_lowercase(),
        })
    }
}

impl std::fmt::Debug for NtHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NtHash")
            .field("user", &self.user)
            .field("hash", &"<redacted>")
            .finish()
    }
}

impl AuthMethod for NtHash {
    fn identifier(&self) -> &str {
        &self.identity
    }

    fn connection_params(&self) -> ConnectionParams {
        let mut params = ConnectionParams::new();
        params.insert("username".to_string(), self.user.clone().into());
        params.insert("nt_hash".to_string(), self.hash.to_ascii_lowercase().into());
        params
    }

    fn show(&self) -> Vec<(String, String)> {
        vec![
            ("User".to_string(), self.user.clone()),
            ("NT hash".to_string(), self.hash.clone()),
        ]
    }

    fn edit(&mut self, edits: &FieldEdits, _ctx: &MethodContext) -> Result<()> {
        let mut user = self.user.as_str();
        let mut hash = self.hash.as_str();
        for (field, value) in edits {
            match field.as_str() {
                "user" => user = value.as_str(),
                "hash" => hash = value.as_str(),
                other => {
                    return Err(CredsError::malformed(
                        Self::KIND,
                        format!("unknown field '{}'", other),
                    ));
                }
            }
        }
        *self = Self::parse(&format!("{}:{}", user, hash))?;
        Ok(())
    }

    fn serialize(&self) -> String {
        format!("{}:{}", self.user, self.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "31D6CFE0D16AE931B73C59D7E0C089C0";

    #[test]
    fn test_identity_is_lowercased_user() {
        let upper = NtHash::parse(&format!("Administrator:{}", HASH)).unwrap();
        let lower = NtHash::parse(&format!("administrator:{}", HASH.to_lowercase())).unwrap();
        assert_eq!(upper.identifier(), "administrator");
        assert_eq!(upper.identifier(), lower.identifier());
        assert_ne!(upper.serialize(), lower.serialize());
    }

    #[test]
    fn test_hash_stays_out_of_identity_and_debug() {
        let creds = NtHash::parse(&format!("admin:{}", HASH)).unwrap();
        let hash = HASH.to_lowercase();
        assert!(!creds.identifier().to_lowercase().contains(&hash));
        assert!(!format!("{:?}", creds).to_lowercase().contains(&hash));
        assert!(format!("{:?}", creds).contains("admin"));
    }

    #[test]
    fn test_rejects_bad_hash() {
        assert!(NtHash::parse("admin:1234").is_err());
        assert!(NtHash::parse(&format!("admin:{}", "z".repeat(32))).is_err());
        assert!(NtHash::parse(HASH).is_err());
    }

    #[test]
    fn test_edit_user() {
        let ctx = MethodContext::new("/tmp");
        let mut creds = NtHash::parse(&format!("admin:{}", HASH)).unwrap();
        let mut edits = FieldEdits::new();
        edits.insert("user".to_string(), "svc_backup".to_string());
        creds.edit(&edits, &ctx).unwrap();
        assert_eq!(creds.serialize(), format!("svc_backup:{}", HASH));
        assert_eq!(creds.identifier(), "svc_backup");
    }
}

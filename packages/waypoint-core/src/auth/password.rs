//! Plain password authentication (`user:password`).

use super::{split_user_secret, AuthMethod, ConnectionParams, FieldEdits, MethodContext};
use crate::error::{CredsError, Result};

#[derive(Clone)]
pub struct Password {
    user: String,
    password: String,
}

impl Password {
    pub const KIND: &'static str = "password";

    pub fn parse(content: &str) -> Result<Self> {
        let (user, password) = split_user_secret(Self::KIND, content)?;
        Ok(Self {
            user: user.to_string(),
            password: password.to_string(),
        })
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl AuthMethod for Password {
    fn identifier(&self) -> &str {
        &self.user
    }

    fn connection_params(&self) -> ConnectionParams {
        let mut params = ConnectionParams::new();
        params.insert("username".to_string(), self.user.clone().into());
        params.insert("password".to_string(), self.password.clone().into());
        params
    }

    fn show(&self) -> Vec<(String, String)> {
        vec![
            ("User".to_string(), self.user.clone()),
            ("Password".to_string(), self.password.clone()),
        ]
    }

    fn edit(&mut self, edits: &FieldEdits, _ctx: &MethodContext) -> Result<()> {
        let mut updated = self.clone();
        for (field, value) in edits {
            match field.as_str() {
                "user" if value.is_empty() => {
                    return Err(CredsError::malformed(Self::KIND, "empty user name"));
                }
                "user" if value.contains(':') => {
                    return Err(CredsError::malformed(Self::KIND, "user name cannot contain ':'"));
                }
                "user" => updated.user = value.clone(),
                "password" => updated.password = value.clone(),
                other => {
                    return Err(CredsError::malformed(
                        Self::KIND,
                        format!("unknown field '{}'", other),
                    ));
                }
            }
        }
        *self = updated;
        Ok(())
    }

    fn serialize(&self) -> String {
        format!("{}:{}", self.user, self.password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_user() {
        let creds = Password::parse("admin:s3cr:et").unwrap();
        assert_eq!(creds.identifier(), "admin");
        assert_eq!(creds.serialize(), "admin:s3cr:et");
        assert_eq!(
            creds.connection_params().get("password"),
            Some(&serde_json::Value::from("s3cr:et"))
        );
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = Password::parse("admin:hunter2").unwrap();
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("admin"));
    }

    #[test]
    fn test_edit_is_all_or_nothing() {
        let ctx = MethodContext::new("/tmp");
        let mut creds = Password::parse("admin:old").unwrap();

        let mut edits = FieldEdits::new();
        edits.insert("password".to_string(), "new".to_string());
        edits.insert("shell".to_string(), "bash".to_string());
        assert!(creds.edit(&edits, &ctx).is_err());
        assert_eq!(creds.serialize(), "admin:old");

        edits.remove("shell");
        creds.edit(&edits, &ctx).unwrap();
        assert_eq!(creds.serialize(), "admin:new");
    }
}

//! Authentication method codecs.
//!
//! Each method kind (`password`, `privkey`, `nthash`, ...) is handled by an
//! [`AuthMethod`] implementation that turns serialized content into a
//! canonical identifier and connection parameters. Codecs are looked up by
//! kind through a [`MethodRegistry`].

mod nthash;
mod password;
mod privkey;
mod registry;

use crate::error::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub use nthash::NtHash;
pub use password::Password;
pub use privkey::PrivateKey;
pub use registry::{MethodFactory, MethodRegistry};

/// Connection parameters handed to the connection layer (key/value bag).
pub type ConnectionParams = BTreeMap<String, serde_json::Value>;

/// Field updates applied by [`AuthMethod::edit`], keyed by field name.
pub type FieldEdits = BTreeMap<String, String>;

/// Directory under the workspace where key material is kept.
const KEYS_DIR: &str = "keys";

/// Workspace context handed to codecs that keep state on disk.
#[derive(Debug, Clone)]
pub struct MethodContext {
    workspace_dir: PathBuf,
}

impl MethodContext {
    pub fn new(workspace_dir: impl Into<PathBuf>) -> Self {
        Self {
            workspace_dir: workspace_dir.into(),
        }
    }

    pub fn workspace_dir(&self) -> &Path {
        &self.workspace_dir
    }

    /// Directory for key files owned by the workspace
    pub fn keys_dir(&self) -> PathBuf {
        self.workspace_dir.join(KEYS_DIR)
    }

    /// Resolve a possibly relative path against the workspace directory
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_dir.join(path)
        }
    }
}

/// Method-specific behaviour behind a credential.
///
/// Implementations are built from serialized content by a [`MethodFactory`].
/// Two instances with equal `identifier()` are the same logical credential
/// even when their serialized content differs.
pub trait AuthMethod: std::fmt::Debug + Send + Sync {
    /// Canonical identity used for deduplication within the method kind
    fn identifier(&self) -> &str;

    /// Parameters to authenticate a connection with
    fn connection_params(&self) -> ConnectionParams;

    /// Field/value pairs describing the credential, for display
    fn show(&self) -> Vec<(String, String)>;

    /// Apply field updates in place.
    ///
    /// Fails with `MalformedContent` for unknown fields or values the method
    /// cannot accept; the codec is left unchanged in that case.
    fn edit(&mut self, edits: &FieldEdits, ctx: &MethodContext) -> Result<()>;

    /// Serialized form stored in the `content` column
    fn serialize(&self) -> String;

    /// Write any state the method keeps outside the credential row.
    /// Called before the row is saved.
    fn persist(&self, _ctx: &MethodContext) -> Result<()> {
        Ok(())
    }

    /// Remove any state the method keeps outside the credential row.
    fn delete(&self, _ctx: &MethodContext) -> Result<()> {
        Ok(())
    }
}

/// Split `user:secret` content, rejecting an empty user.
pub(crate) fn split_user_secret<'a>(method: &str, content: &'a str) -> Result<(&'a str, &'a str)> {
    let (user, secret) = content
        .split_once(':')
        .ok_or_else(|| crate::CredsError::malformed(method, "expected 'user:secret'"))?;
    if user.is_empty() {
        return Err(crate::CredsError::malformed(method, "empty user name"));
    }
    Ok((user, secret))
}

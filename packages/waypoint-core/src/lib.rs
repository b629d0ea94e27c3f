//! Waypoint Core Library
//!
//! Credential registry for network traversal workspaces:
//! - Pluggable authentication method codecs (password, private key, NT hash)
//! - Deduplication of credentials by method kind and codec identity
//! - SQLite persistence of credentials alongside endpoints and connections
//! - Cascading deletion with a report of everything removed
//!
//! # Example
//!
//! ```no_run
//! use waypoint_core::{Credential, CredsError, Workspace};
//!
//! fn main() -> Result<(), CredsError> {
//!     let workspace = Workspace::open(std::path::Path::new("./engagement"))?;
//!
//!     // Same identity, same row
//!     let mut creds = Credential::open(&workspace, "password", "admin:Winter2024!")?;
//!     creds.save(&workspace)?;
//!     let again = Credential::open(&workspace, "password", "admin:Winter2024!")?;
//!     assert_eq!(creds.id(), again.id());
//!
//!     // Delete along with the connections using it
//!     let report = again.delete(&workspace, &workspace.topology())?;
//!     println!("Removed: {:?}", report);
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cascade;
pub mod config;
pub mod credential;
pub mod error;
pub mod identity;
pub mod store;
pub mod topology;
pub mod workspace;

// Re-export commonly used types
pub use auth::{AuthMethod, ConnectionParams, FieldEdits, MethodContext, MethodRegistry};
pub use cascade::{CascadeDeleter, CascadeStage, DeleteReport, CREDS_KIND};
pub use config::{load_workspace_config, ConfigSource, WorkspaceConfig};
pub use credential::Credential;
pub use error::CredsError;
pub use identity::{Fingerprint, IdentityResolver};
pub use store::{CredentialStore, CredsRow, FoundFilter, NewCreds, ScopeFilter};
pub use topology::{ConnectionSource, DependentConnection, EndpointId, EndpointLookup, SqliteTopology};
pub use workspace::Workspace;

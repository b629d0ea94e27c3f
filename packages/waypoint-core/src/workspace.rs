//! A workspace directory: its database, key files and registered auth methods.
//!
//! ```text
//! <workspace>/
//!   workspace.db    credentials, endpoints, connections
//!   keys/           key files owned by the workspace
//! ```

use crate::auth::{MethodContext, MethodRegistry};
use crate::error::Result;
use crate::identity::IdentityResolver;
use crate::store::CredentialStore;
use crate::topology::SqliteTopology;
use std::fs;
use std::path::Path;

const DB_FILE_NAME: &str = "workspace.db";

pub struct Workspace {
    store: CredentialStore,
    methods: MethodRegistry,
}

impl Workspace {
    /// Open the workspace at `dir`, creating it on first use
    pub fn open(dir: &Path) -> Result<Self> {
        let context = MethodContext::new(dir);
        fs::create_dir_all(context.keys_dir())?;

        let store = CredentialStore::open(&dir.join(DB_FILE_NAME))?;
        let workspace = Self::assemble(store, context)?;
        tracing::info!(
            "Opened workspace {:?} ({} credentials)",
            dir,
            workspace.store.count()?
        );
        Ok(workspace)
    }

    /// Workspace backed by an in-memory database; key files still live under
    /// `dir`.
    pub fn open_in_memory(dir: &Path) -> Result<Self> {
        let context = MethodContext::new(dir);
        fs::create_dir_all(context.keys_dir())?;
        Self::assemble(CredentialStore::open_in_memory()?, context)
    }

    fn assemble(store: CredentialStore, context: MethodContext) -> Result<Self> {
        SqliteTopology::new(store.connection()).init_schema()?;
        Ok(Self {
            store,
            methods: MethodRegistry::with_builtin(context),
        })
    }

    pub fn dir(&self) -> &Path {
        self.methods.context().workspace_dir()
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn methods(&self) -> &MethodRegistry {
        &self.methods
    }

    /// Registry access for plugging in extra auth methods
    pub fn methods_mut(&mut self) -> &mut MethodRegistry {
        &mut self.methods
    }

    pub fn resolver(&self) -> IdentityResolver<'_> {
        IdentityResolver::new(&self.methods)
    }

    /// Endpoint and connection tables of this workspace
    pub fn topology(&self) -> SqliteTopology<'_> {
        SqliteTopology::new(self.store.connection())
    }
}

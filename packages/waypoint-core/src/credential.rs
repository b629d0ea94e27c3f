//! Credentials as seen by the rest of the tool.
//!
//! A [`Credential`] joins the persisted row (id, scope flag, discovery
//! endpoint) with the codec that understands its content. Building one always
//! reads the store, so every construction for the same method kind and
//! identity sees the same id and persisted state. There is no in-process
//! cache to invalidate.

use crate::auth::{AuthMethod, ConnectionParams, FieldEdits};
use crate::cascade::{CascadeDeleter, DeleteReport};
use crate::error::{CredsError, Result};
use crate::identity::Fingerprint;
use crate::store::{CredsRow, FoundFilter, NewCreds, ScopeFilter};
use crate::topology::{ConnectionSource, EndpointId, EndpointLookup};
use crate::workspace::Workspace;

pub struct Credential {
    method_kind: String,
    content: String,
    identity: String,
    codec: Box<dyn AuthMethod>,
    id: Option<i64>,
    in_scope: bool,
    found: Option<EndpointId>,
}

impl Credential {
    /// Decode `content` and pick up the stored row for its identity, if any.
    ///
    /// The content kept (and saved) is the codec's serialized form, which
    /// may differ from the input, e.g. a key file path becomes the key itself.
    /// Unsaved credentials start in scope and not attached to any endpoint.
    pub fn open(workspace: &Workspace, method_kind: &str, content: &str) -> Result<Self> {
        let (codec, identity) = workspace.resolver().decode(method_kind, content)?;

        let mut creds = Self {
            method_kind: method_kind.to_string(),
            content: codec.serialize(),
            identity,
            codec,
            id: None,
            in_scope: true,
            found: None,
        };

        if let Some(row) = workspace
            .store()
            .find_by_identity(&creds.method_kind, &creds.identity)?
        {
            tracing::debug!("Hydrated {} credentials #{}", creds.method_kind, row.id);
            creds.hydrate(&row);
        }

        Ok(creds)
    }

    /// Load credentials by storage id
    pub fn find_one(workspace: &Workspace, id: i64) -> Result<Option<Self>> {
        match workspace.store().find_by_id(id)? {
            Some(row) => Self::open(workspace, &row.method_kind, &row.content).map(Some),
            None => Ok(None),
        }
    }

    /// Load every stored credential matching both filters
    pub fn find_all(workspace: &Workspace, scope: ScopeFilter, found: FoundFilter) -> Result<Vec<Self>> {
        workspace
            .store()
            .list_all(scope, found)?
            .iter()
            .map(|row| Self::open(workspace, &row.method_kind, &row.content))
            .collect()
    }

    fn hydrate(&mut self, row: &CredsRow) {
        self.id = Some(row.id);
        self.in_scope = row.in_scope;
        self.found = row.found;
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn is_saved(&self) -> bool {
        self.id.is_some()
    }

    pub fn method_kind(&self) -> &str {
        &self.method_kind
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn in_scope(&self) -> bool {
        self.in_scope
    }

    pub fn found(&self) -> Option<EndpointId> {
        self.found
    }

    pub fn codec(&self) -> &dyn AuthMethod {
        self.codec.as_ref()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.method_kind, &self.identity)
    }

    /// Change the scope flag; persisted by the next [`save`](Self::save)
    pub fn set_scope(&mut self, in_scope: bool) {
        self.in_scope = in_scope;
    }

    /// Change the discovery endpoint; persisted by the next [`save`](Self::save)
    pub fn set_found(&mut self, found: Option<EndpointId>) {
        self.found = found;
    }

    /// The endpoint these credentials were found on
    pub fn discovered_at<L: EndpointLookup>(&self, endpoints: &L) -> Result<Option<L::Endpoint>> {
        match self.found {
            Some(id) => endpoints.find_endpoint(id),
            None => Ok(None),
        }
    }

    /// Parameters for authenticating a connection with these credentials
    pub fn connection_params(&self) -> ConnectionParams {
        self.codec.connection_params()
    }

    pub fn show(&self) -> Vec<(String, String)> {
        self.codec.show()
    }

    /// Persist the current state.
    ///
    /// Saved credentials are updated in place. New ones are inserted and their
    /// id is read back by identity. If another writer stored the same identity
    /// first, that row is adopted instead of creating a second one.
    pub fn save(&mut self, workspace: &Workspace) -> Result<()> {
        self.codec.persist(workspace.methods().context())?;

        let store = workspace.store();
        let row = NewCreds {
            method_kind: &self.method_kind,
            content: &self.content,
            identifier: &self.identity,
            in_scope: self.in_scope,
            found: self.found,
        };

        if let Some(id) = self.id {
            store.update(id, &row)?;
            tracing::info!("Saved {} credentials #{}", self.method_kind, id);
            return Ok(());
        }

        let inserted = match store.insert(&row) {
            Ok(id) => Some(id),
            Err(CredsError::DuplicateIdentity { existing_id, .. }) => {
                tracing::warn!(
                    "{} credentials {} already stored as #{}, adopting it",
                    self.method_kind,
                    self.fingerprint(),
                    existing_id
                );
                None
            }
            Err(e) => return Err(e),
        };

        let stored = store
            .find_by_identity(&self.method_kind, &self.identity)?
            .ok_or(CredsError::NotFound(inserted.unwrap_or_default()))?;
        if inserted.is_some() {
            self.id = Some(stored.id);
        } else {
            self.hydrate(&stored);
        }

        tracing::info!("Saved {} credentials #{}", self.method_kind, stored.id);
        Ok(())
    }

    /// Apply field edits through the codec and save the result.
    ///
    /// An edit that would change the identity is refused with
    /// `IdentityChanged` and leaves both the entity and its row untouched;
    /// such a change is a different credential and must be created as one.
    pub fn edit(&mut self, workspace: &Workspace, edits: &FieldEdits) -> Result<()> {
        let methods = workspace.methods();
        let mut codec = methods.decode(&self.method_kind, &self.content)?;
        codec.edit(edits, methods.context())?;

        let identity = codec.identifier();
        if identity != self.identity {
            return Err(CredsError::IdentityChanged {
                from: self.identity.clone(),
                to: identity.to_string(),
            });
        }

        self.content = codec.serialize();
        self.codec = codec;
        self.save(workspace)
    }

    /// Delete these credentials and every connection using them.
    ///
    /// See [`CascadeDeleter`]. Unsaved credentials produce an empty report.
    pub fn delete<C: ConnectionSource>(self, workspace: &Workspace, connections: &C) -> Result<DeleteReport> {
        CascadeDeleter::new(workspace, connections).delete(self)
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.method_kind == other.method_kind
            && self.identity == other.identity
            && self.id == other.id
    }
}

impl Eq for Credential {}

// Content may hold secrets, so it is left out of Debug output
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("method_kind", &self.method_kind)
            .field("fingerprint", &self.fingerprint())
            .field("in_scope", &self.in_scope)
            .field("found", &self.found)
            .finish()
    }
}

impl std::fmt::Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.id {
            Some(id) => write!(f, "#{}", id),
            None => write!(f, "#-"),
        }
    }
}

//! Network topology collaborators.
//!
//! Credentials only hold a nullable reference to the endpoint they were found
//! on, and connections reference credentials by id. The traits here are what
//! the registry needs from the topology side; [`SqliteTopology`] implements
//! them over the workspace database.

mod sqlite;

use crate::cascade::DeleteReport;
use crate::error::Result;
use serde::{Deserialize, Serialize};

pub use sqlite::{ConnectionRow, EndpointRow, SqliteTopology, StoredConnection, CONNECTIONS_KIND};

/// Storage id of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointId(pub i64);

impl std::fmt::Display for EndpointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Endpoint lookup by id.
pub trait EndpointLookup {
    type Endpoint;

    fn find_endpoint(&self, id: EndpointId) -> Result<Option<Self::Endpoint>>;
}

/// A connection that must go away together with the credentials it uses.
pub trait DependentConnection {
    /// Delete the connection and everything depending on it, reporting what
    /// was removed.
    fn delete(self) -> Result<DeleteReport>;
}

/// Enumerates the connections that authenticate with a given credential.
pub trait ConnectionSource {
    type Connection: DependentConnection;

    fn find_all_by_credential(&self, creds_id: i64) -> Result<Vec<Self::Connection>>;
}

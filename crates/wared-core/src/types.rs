//! Domain types shared across the Wared client core

use serde::{Deserialize, Serialize};

/// Reference to the department a user belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentRef {
    /// Department identifier
    pub id: i64,
    /// Display name of the department
    pub name: String,
}

/// Profile of the authenticated user, as returned by the profile endpoint.
///
/// The profile is always re-derived from the network after a token is
/// acquired or restored; it is never persisted locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// User identifier
    pub id: i64,
    /// Full display name
    pub full_name: String,
    /// Login name
    pub username: String,
    /// Department the user belongs to, if any
    #[serde(default)]
    pub department: Option<DepartmentRef>,
    /// Role names assigned to the user, in server order
    #[serde(default)]
    pub roles: Vec<String>,
}

//! Site personnel records.

use serde::{Deserialize, Serialize};

use crate::fields::Role;

/// A registered member of the site organisation.
///
/// `reports_to` links each user to their direct manager, forming the
/// reports-to forest used for assignment authorisation. Top-level managers
/// have no `reports_to`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub department: String,
    pub reports_to: Option<u64>,
    pub created_at_utc: i64,
}

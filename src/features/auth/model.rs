use serde::{Deserialize, Serialize};

/// Identity of a request that passed the admin gate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminPrincipal {
    pub username: String,
}

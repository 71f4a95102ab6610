//! Admin authorization.
//!
//! Admin routes are wrapped by [`crate::core::middleware::admin_auth_middleware`],
//! which checks HTTP Basic credentials on every request. Handlers declare the
//! requirement with the [`guards::RequireAdmin`] extractor.

pub mod guards;
pub mod model;

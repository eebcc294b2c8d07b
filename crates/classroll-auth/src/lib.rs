//! # Classroll Auth
//!
//! Identity & session guard consumed by the enrollment core. It verifies a
//! presented bearer credential and yields the caller's [`Actor`]
//! (`user_id` + [`Role`]); issuance, refresh and revocation belong to the
//! session service in front of Classroll.
//!
//! [`Actor`]: classroll_models::Actor
//! [`Role`]: classroll_models::Role

pub mod claims;
pub mod jwt;

pub use claims::Claims;
pub use jwt::{authorize, create_access_token, verify_token};

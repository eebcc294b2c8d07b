pub mod auth_helpers;

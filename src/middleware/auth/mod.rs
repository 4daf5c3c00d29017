pub mod access;

pub use access::{Authorizer, DEFAULT_GRANT_CLAIM, DEFAULT_USER_ID_CLAIM};

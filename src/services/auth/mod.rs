pub mod claims;
pub mod factory;
pub mod token;

pub use factory::build_authorizer;
pub use token::{Token, ValidationPolicy};

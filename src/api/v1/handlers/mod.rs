pub mod admin;
pub mod health;
pub mod items;
pub mod me;

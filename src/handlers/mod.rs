pub mod auth;
pub mod health;
pub mod polish;
pub mod stories;

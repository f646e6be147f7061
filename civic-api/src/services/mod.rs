pub mod auth;
pub mod geo;
pub mod moderation;
pub mod reports;
pub mod suggestions;

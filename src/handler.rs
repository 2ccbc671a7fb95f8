pub mod auth;
pub mod category;
pub mod content;
pub mod files;
pub mod users;

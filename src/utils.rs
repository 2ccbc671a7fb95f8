pub mod blob;
pub mod password;
pub mod text;
pub mod token;

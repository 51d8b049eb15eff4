pub mod chapters;
pub mod download;
pub mod search;
pub mod settings;

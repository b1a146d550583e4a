pub mod blob;
pub mod metadata;

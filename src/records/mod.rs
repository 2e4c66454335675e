pub mod portal;
pub mod store;
pub mod twin;

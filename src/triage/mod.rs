pub mod answers;
pub mod response;
pub mod session;
pub mod store;

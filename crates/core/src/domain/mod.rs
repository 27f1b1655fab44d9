pub mod booking;
pub mod request;
pub mod session;
pub mod slot;

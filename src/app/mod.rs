pub mod clients;
pub mod publisher;

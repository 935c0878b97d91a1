pub mod client;
pub mod errors;
pub mod hook;
pub(crate) mod http_request;
pub mod storage;
pub mod types;

pub mod client;
pub mod error;
pub mod gateway;
pub mod types;

pub use client::{ApiTransport, Connector, HttpConnector};
pub use error::ApiError;
pub use gateway::Gateway;
pub use types::ApiCall;

pub mod channel;
pub mod client;
#[cfg(test)]
pub mod mock_client;

pub use channel::{Channel, StreamClient};
pub use client::ApiClient;

mod client;
pub use client::QueueClient;

mod config;
pub use config::QueueConfig;

mod error;
pub use error::QueueError;

mod query;
pub use query::Direction;

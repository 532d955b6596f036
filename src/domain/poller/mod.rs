pub mod error;
pub mod service;

pub use error::PollerError;
pub use service::{select_target, PollerConfig, RelayPoller};

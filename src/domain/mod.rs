pub mod federation;
pub mod poller;
pub mod relay;
pub mod task;

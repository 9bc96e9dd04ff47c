pub mod bus;
pub mod engine;
pub mod relay;
pub mod status_pool;
pub mod sweeper;

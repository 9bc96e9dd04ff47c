pub mod descriptor;
pub mod entry;
pub mod ports;
pub mod queue;

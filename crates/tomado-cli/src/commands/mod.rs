pub mod common;
pub mod config;
pub mod interrupt;
pub mod task;
pub mod timer;

pub mod logging;
pub mod memory;
pub mod mock;
pub mod postgres;

pub mod commands;
pub mod errors;
pub mod item;
pub mod lending;
pub mod reservation;
pub mod value_objects;

pub use errors::*;
pub use item::*;
pub use reservation::*;
pub use value_objects::*;

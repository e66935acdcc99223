mod catalog_service;
mod errors;
mod lending_service;

pub use catalog_service::{create_item, delete_item, get_item, list_items, list_reservations};
pub use errors::{LendingApplicationError, Result};
pub use lending_service::{
    BorrowOutcome, ReturnOutcome, ServiceDependencies, borrow_or_queue, return_item,
};

pub mod lending_store;
pub mod notification_service;

pub use lending_store::{LendingStore, LendingUnitOfWork};
pub use notification_service::NotificationService;

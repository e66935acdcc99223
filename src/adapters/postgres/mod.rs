pub mod item_repository;
pub mod lending_store;
pub mod repository;
pub mod reservation_repository;

// パブリックに型を再エクスポート
pub use item_repository::ItemRepository;
pub use lending_store::LendingStore as PostgresLendingStore;
pub use repository::{Entity, Repository};
pub use reservation_repository::ReservationRepository;

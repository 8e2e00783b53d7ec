pub mod shipment_repository;
pub mod change_log_repository;
pub mod repository_trait;

pub use shipment_repository::*;
pub use change_log_repository::*;
pub use repository_trait::*;

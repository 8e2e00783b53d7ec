pub mod sheet_client;
pub mod google_sheets;
pub mod memory_sheets;

pub use sheet_client::*;
pub use google_sheets::GoogleSheetsClient;
pub use memory_sheets::MemorySheets;

pub mod sheets;
pub mod clock;
pub mod export;

pub use sheets::{GoogleSheetsClient, MemorySheets, Row, SheetClient};
pub use clock::{Clock, FixedClock, SiteClock};

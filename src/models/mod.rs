pub mod istates;
pub mod irecord;
pub mod ilog;

pub use istates::*;
pub use irecord::*;
pub use ilog::*;

pub mod shipment_controller;

pub use shipment_controller::*;

pub mod archive;
pub mod config;
pub mod controllers;
pub mod errors;
pub mod init;
pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;

pub mod config;
pub mod error;
pub mod extract;
pub mod icon;
pub mod locations;
pub mod model;
pub mod providers;
pub mod service;
pub mod weekend;

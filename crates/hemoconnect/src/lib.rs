pub mod bloodbank;
pub mod config;
pub mod error;
pub mod telemetry;

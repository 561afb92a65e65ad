pub mod access;
pub mod alerts;
pub mod api;
pub mod backend;
pub mod cache;
pub mod clock;
pub mod config;
pub mod csv_import;
pub mod entities;
pub mod error;
pub mod metrics;
pub mod migrator;
pub mod models;
pub mod notifications;
pub mod refresher;
pub mod reports;
pub mod scan;
pub mod session;
pub mod settings;
pub mod state;
pub mod telemetry;
pub mod tracker;
pub mod users;

pub use sea_orm;

//! Core domain types and simulation logic.

pub mod clock;
pub mod price_series;
pub mod transaction;
pub mod holding;
pub mod ledger;
pub mod strategy;
pub mod runner;
pub mod report;
pub mod symbols;
pub mod catalog;
pub mod config_validation;
pub mod error;

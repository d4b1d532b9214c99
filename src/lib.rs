#![warn(missing_docs)]
//! Printwatch monitors a fleet of networked printers: it discovers devices on
//! the network, evaluates consumable-supply levels against configurable
//! thresholds, forecasts depletion, and dispatches notifications with
//! deduplication, rate limiting, and retry.

pub mod alerts;
pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod forecast;
pub mod http_client;
pub mod models;
pub mod persistence;
pub mod providers;
pub mod supervisor;
pub mod test_helpers;

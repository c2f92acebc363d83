//! # Repository Implementations
//!
//! One repository per concern:
//!
//! - [`catalog`] - product CRUD + frequency-tier classification
//! - [`ledger`] - atomic sale confirmation, borrows, payments (the only
//!   writer of ledger tables besides the sync engine's pull upserts)
//! - [`statistics`] - read-only aggregation over completed periods
//! - [`analytics`] - read-only distributions for the forecast module

pub mod analytics;
pub mod catalog;
pub mod ledger;
pub mod statistics;

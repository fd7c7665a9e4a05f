// Service Directory - Data Access Core
//
// This crate provides the data-access layer for the provider/service
// directory: depth-aware entity fetching, reconstruction of entity graphs
// from denormalized join-query rows, and diff-based synchronization of the
// provider/service relation table.
//
// HTTP routing, request shaping, and dependency wiring live in the
// application that embeds this crate.

pub mod common;
pub mod config;
pub mod domains;

pub use config::*;

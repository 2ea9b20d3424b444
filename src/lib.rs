//! Dependency aggregation: combine ordered groups of scripts or stylesheets
//! into single checksum-addressed artifacts, with layered caching.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;

//! Core data types for the resolution pipeline.

pub mod config;
pub mod enrichment;
pub mod entity;
pub mod filing;
pub mod report;
pub mod signals;

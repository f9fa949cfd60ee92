//! Pipeline stages, in execution order.
//!
//! Stage-sequential: normalize -> aggregate -> evidence -> signals ->
//! fuse -> rules, each stage durable before the next begins. The
//! [`runner::Pipeline`] type sequences them over a store.

pub mod aggregate;
pub mod evidence;
pub mod fuse;
pub mod normalize;
pub mod resolve;
pub mod rules;
pub mod runner;
pub mod signals;

pub use runner::{Pipeline, DEFAULT_QUERIES};

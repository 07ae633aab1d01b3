//! Pipeline description.
//!
//! ## Contents
//! - [`Stage`], [`PipelineDescriptor`] typed stage graph
//! - [`build`] validation + deterministic construction from config and endpoint

mod builder;
mod stage;

pub use builder::build;
pub use stage::{PipelineDescriptor, Stage};

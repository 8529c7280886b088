//! # masklm-common — Shared Primitives
//!
//! Types shared across every crate in the workspace:
//!
//! * **[`PipelineParams`]** — the full configuration surface (serialised as JSON).
//! * **[`PipelineMode`]** / **[`MaskProbability`]** — mode tag and masking-probability knob.
//! * **[`Error`]** — the pipeline error taxonomy.

pub mod config;
pub mod error;

pub use config::{MaskProbability, PipelineMode, PipelineParams};
pub use error::{Error, Result};

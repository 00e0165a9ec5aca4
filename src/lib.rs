//! Visual Mileage - corrected mileage reports from Timeero timeclock text
//!
//! Visual Mileage turns text pasted from Timeero into a branch-to-branch
//! mileage report through a deterministic pipeline: line parsing → timestamp
//! normalization → per-day leg reconstruction → mileage chart lookup →
//! report writing.
//!
//! ## Modules
//!
//! - **Parsing**: `parser`, `normalizer` turn noisy pasted text into ordered visits
//! - **Legs**: `legs`, `resolver` infer travel and attach chart distances
//! - **Lookups**: `locations`, `reference` hold the branch codes and mileage chart
//! - **Output**: `report`, `pipeline`, `ffi` write the artifact and serve callers

pub mod config;
pub mod error;
pub mod legs;
pub mod locations;
pub mod normalizer;
pub mod parser;
pub mod pipeline;
pub mod reference;
pub mod report;
pub mod resolver;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::MileageConfig;
pub use error::MileageError;
pub use locations::LocationCodeMap;
pub use pipeline::{completion_message, text_to_legs, MileageProcessor, MileageRun};
pub use reference::ReferenceTable;
pub use report::ReportFormat;
pub use types::{Leg, RunStats};

/// Library version reported by the CLI and FFI
pub const MILEAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports and diagnostics
pub const PRODUCER_NAME: &str = "visual-mileage";

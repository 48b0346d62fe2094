// src/lib.rs

//! Coverage-guided minimization of a capture file collection.
//!
//! Each sample's branch trace is registered in a [`CoverageIndex`], the index
//! is annotated with forward run lengths, and a greedy jump cover picks the
//! samples to keep. [`Distiller`] wires this to external tracers and to the
//! menagerie on disk.

pub mod annotate;
pub mod cli;
pub mod corpus;
pub mod distill;
pub mod error;
pub mod index;
pub mod ingest;
pub mod model;
pub mod select;
pub mod tracer;

pub use distill::{DistillConfig, Distiller, TraceErrorPolicy};
pub use error::{DistillError, IndexError, TraceError};
pub use index::CoverageIndex;
pub use select::Selection;

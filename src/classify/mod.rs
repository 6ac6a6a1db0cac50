//! Frame classification.
//!
//! This module defines the seam between the pipeline and the classification
//! model. The model is opaque to the rest of the system: it receives one RGB
//! frame and answers with a label and a confidence score. Backends:
//! - Stub (frame-change + intensity heuristic, always available)
//! - Tract ONNX inference (feature: backend-tract)

mod backend;
mod backends;

pub use backend::{Classification, ClassifierBackend, Label};
pub use backends::StubClassifier;

#[cfg(feature = "backend-tract")]
pub use backends::TractClassifier;

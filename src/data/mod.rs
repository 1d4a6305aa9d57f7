//! Modelo de datos del pipeline: configuración tipada, fases y tipos
//! neutrales (artifacts, outcomes, estado).

pub mod phase;
pub mod simconfig;
pub mod types;

pub use phase::{Phase, PrepStep};
pub use simconfig::SimulationConfig;
pub use types::{Artifact, ArtifactMap, PipelineState, ProgressEvent, StageOutcome};

//! GmxFlow Rust Library
//!
//! Este crate actúa como la librería central de GmxFlow:
//! - Expone `data` con las fases, la configuración de simulación y los tipos
//!   neutrales del pipeline (artifacts, estados, resultados).
//! - Expone `exec` con la capa de ejecución de procesos: comandos del engine,
//!   streaming de líneas, el trait `EngineProvider` y el mock determinista.
//! - Expone `pipeline` con el orquestador (`PipelineManager`) y la costura de
//!   observación de fases.
//! - Expone `templates`, `progress`, `resolver` y `forcefield` como soporte:
//!   archivos de control, extracción de progreso, validación de parámetros
//!   crudos y descubrimiento de campos de fuerza.
//!
//! Puede usarse desde `main.rs` o por otros crates/clientes.

pub mod config;
pub mod data;
pub mod errors;
pub mod exec;
pub mod forcefield;
pub mod pipeline;
pub mod progress;
pub mod resolver;
pub mod templates;

pub use config::{AppConfig, EngineConfig, CONFIG};
pub use data::{Artifact, ArtifactMap, Phase, PipelineState, PrepStep, ProgressEvent, SimulationConfig, StageOutcome};
pub use errors::{ExecutionError, PipelineError};
pub use exec::{select_engine, EngineCommand, EngineProvider, EngineStream, GmxEngineProvider, MockEngineProvider};
pub use pipeline::{CancelHandle, NullObserver, PhaseObserver, PipelineManager, StdoutObserver};

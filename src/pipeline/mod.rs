//! Orquestación del pipeline de simulación.
//!
//! - [`manager`]: la máquina de estados de la instancia y la ejecución de
//!   preparación y fases.
//! - [`observer`]: costura de observación de líneas y progreso.

pub mod manager;
pub mod observer;

pub use manager::{CancelHandle, PipelineManager};
pub use observer::{NullObserver, PhaseObserver, StdoutObserver};

//! Errores del núcleo de orquestación.
//! - `exec_error`: fallos al ejecutar el binario del engine (spawn, exit != 0,
//!   cancelación).
//! - `pipeline_error`: fallos del dominio del pipeline (configuración,
//!   artifacts ausentes, transiciones inválidas) que envuelven a los de
//!   ejecución.

pub mod exec_error;
pub mod pipeline_error;

pub use exec_error::ExecutionError;
pub use pipeline_error::PipelineError;

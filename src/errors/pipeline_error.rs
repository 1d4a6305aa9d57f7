use thiserror::Error;

use super::exec_error::ExecutionError;

/// Errores del dominio del pipeline (configuración, artifacts, transiciones).
///
/// Taxonomía:
/// - `Configuration`: entrada inválida, nunca se reintenta, se devuelve
///   inmediatamente al caller.
/// - `MissingArtifact`: un input declarado no existe en disco; fatal para la
///   fase actual y no dispara ningún spawn.
/// - `InvalidTransition`: se pidió una fase fuera del orden fijo.
/// - `Execution`: el proceso hijo falló; envuelve [`ExecutionError`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("missing input artifact: {0}")]
    MissingArtifact(String),
    #[error("invalid phase transition: cannot run {requested} while {state}")]
    InvalidTransition { requested: String, state: String },
    #[error("execution failed: {0}")]
    Execution(#[from] ExecutionError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Código de salida del proceso subyacente, si aplica.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            PipelineError::Execution(e) => e.exit_code(),
            _ => None,
        }
    }
}

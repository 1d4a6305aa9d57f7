use thiserror::Error;

/// Errores de ejecución de procesos del engine externo.
///
/// Cada variante captura lo necesario para diagnóstico: el código de salida
/// y la salida combinada del proceso cuando existió, o el motivo de la
/// cancelación cuando el consumidor abortó el stream.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// El proceso terminó con código distinto de cero.
    #[error("engine exited with code {code}: {output}")]
    NonZeroExit { code: i32, output: String },
    /// El proceso fue terminado por una señal (sin código de salida).
    #[error("engine terminated by signal: {output}")]
    Signalled { output: String },
    /// Fallo al crear el proceso o al operar sobre sus pipes.
    #[error("engine spawn/io failure: {0}")]
    Spawn(#[from] std::io::Error),
    /// El consumidor canceló la fase en vuelo; el hijo fue terminado.
    #[error("engine execution cancelled: {0}")]
    Cancelled(String),
}

impl ExecutionError {
    /// Código de salida capturado, si el proceso llegó a terminar solo.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecutionError::NonZeroExit { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Salida combinada capturada (vacía para spawn/cancelación).
    pub fn captured_output(&self) -> &str {
        match self {
            ExecutionError::NonZeroExit { output, .. } => output,
            ExecutionError::Signalled { output } => output,
            _ => "",
        }
    }
}

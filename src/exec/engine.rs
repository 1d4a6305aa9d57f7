//! Providers de ejecución del engine.
//!
//! El trait `EngineProvider` es la costura entre el orquestador y el binario
//! externo: el provider real delega en el ejecutor de procesos; el mock
//! sintetiza salida determinista. La selección es estática por instancia de
//! orquestador: se sondea el binario una sola vez en la construcción y
//! cualquier error (ausencia, salida distinta de cero, timeout) cae cerrado
//! al modo mock.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{info, warn};

use crate::config::EngineConfig;
use crate::errors::ExecutionError;

use super::command::{self, EngineCommand};
use super::mock::MockEngineProvider;
use super::stream::{self, EngineStream};

/// Costura de ejecución: una implementación por backend (real o mock).
#[async_trait]
pub trait EngineProvider: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// El provider sustituye los archivos de entrada que normalmente
    /// debería aportar el usuario (sólo cierto para el mock).
    fn substitutes_inputs(&self) -> bool {
        false
    }

    /// Ejecuta un paso corto: stdin opcional pre-escrito, salida combinada
    /// capturada, error con código de salida si el paso falló.
    async fn run_buffered(&self,
                          cmd: &EngineCommand,
                          workdir: &Path,
                          stdin_input: Option<&str>)
                          -> Result<String, ExecutionError>;

    /// Ejecuta el paso largo de una fase devolviendo la secuencia perezosa
    /// de líneas; la falla de salida queda diferida a `finish`.
    async fn run_streaming(&self, cmd: &EngineCommand, workdir: &Path) -> Result<EngineStream, ExecutionError>;
}

/// Provider que invoca el binario real instalado.
pub struct GmxEngineProvider {
    gmx: PathBuf,
}

impl GmxEngineProvider {
    pub fn new(gmx: impl Into<PathBuf>) -> Self {
        Self { gmx: gmx.into() }
    }
}

#[async_trait]
impl EngineProvider for GmxEngineProvider {
    fn name(&self) -> &str {
        "gmx"
    }

    fn description(&self) -> &str {
        "GROMACS engine provider (external binary)"
    }

    async fn run_buffered(&self,
                          cmd: &EngineCommand,
                          workdir: &Path,
                          stdin_input: Option<&str>)
                          -> Result<String, ExecutionError> {
        command::run_buffered(&self.gmx, cmd, workdir, stdin_input).await
    }

    async fn run_streaming(&self, cmd: &EngineCommand, workdir: &Path) -> Result<EngineStream, ExecutionError> {
        stream::run_streaming(&self.gmx, cmd, workdir).await
    }
}

/// Selecciona el backend para una instancia de orquestador. El mock explícito
/// por configuración evita el sondeo; de lo contrario se sondea `gmx
/// --version` con timeout corto y se cae cerrado al mock ante cualquier
/// error.
pub async fn select_engine(cfg: &EngineConfig) -> Box<dyn EngineProvider> {
    if cfg.mock_mode {
        info!("mock mode forced by configuration");
        return Box::new(MockEngineProvider::default());
    }

    let gmx = cfg.gmx_command();
    if command::probe(&gmx).await {
        info!("engine binary responded at {}", gmx.display());
        Box::new(GmxEngineProvider::new(gmx))
    } else {
        warn!("engine binary not available at {}, falling back to mock mode", gmx.display());
        Box::new(MockEngineProvider::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_select_engine_forced_mock_skips_probe() {
        let cfg = EngineConfig { bin_path: PathBuf::from("/definitely/missing"),
                                 force_fields_path: PathBuf::from("/tmp"),
                                 mock_mode: true };
        let engine = select_engine(&cfg).await;
        assert_eq!(engine.name(), "mock");
        assert!(engine.substitutes_inputs());
    }

    #[tokio::test]
    async fn test_select_engine_fails_closed_on_missing_binary() {
        let cfg = EngineConfig { bin_path: PathBuf::from("/definitely/missing"),
                                 force_fields_path: PathBuf::from("/tmp"),
                                 mock_mode: false };
        let engine = select_engine(&cfg).await;
        assert_eq!(engine.name(), "mock");
    }
}

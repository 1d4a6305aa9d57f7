//! Sustituto determinista del engine real.
//!
//! Usado de forma transparente cuando el binario no está instalado o el modo
//! mock fue forzado por configuración. Ignora el binario real y sintetiza el
//! efecto observable de cada verbo:
//! - pasos de preparación: escribe los archivos de salida que el comando
//!   nombra (`-o`/`-p`) con contenido sintético, tras una demora fija corta;
//! - ejecución de fase: emite exactamente diez líneas de progreso a
//!   intervalos de un segundo que alcanzan el 100%, y termina limpio.
//!
//! Los números de paso emitidos barren el total asumido del extractor, de
//! modo que el progreso extraído llega exactamente a 100.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tokio::sync::{mpsc, oneshot};
use tokio::time::sleep;

use crate::errors::ExecutionError;
use crate::progress::ASSUMED_TOTAL_STEPS;

use super::command::EngineCommand;
use super::engine::EngineProvider;
use super::stream::EngineStream;

/// Estructura sintética mínima escrita por los pasos de preparación.
pub const MOCK_STRUCTURE: &str =
    "Mock structure\n1\n    1ALA      N    1   1.000   1.000   1.000\n   1.00000   1.00000   1.00000\n";

/// Topología sintética mínima.
pub const MOCK_TOPOLOGY: &str =
    "; Mock topology file\n[ system ]\nProtein\n\n[ molecules ]\nProtein_chain_A    1\n";

/// Cantidad fija de líneas de progreso emitidas por fase.
pub const MOCK_PROGRESS_LINES: u64 = 10;

pub struct MockEngineProvider {
    prep_delay: Duration,
    step_interval: Duration,
}

impl Default for MockEngineProvider {
    fn default() -> Self {
        Self { prep_delay: Duration::from_secs(1),
               step_interval: Duration::from_secs(1) }
    }
}

impl MockEngineProvider {
    /// Demoras explícitas (los tests con tiempo pausado usan las por
    /// defecto; esto existe para demos interactivas más rápidas).
    pub fn with_delays(prep_delay: Duration, step_interval: Duration) -> Self {
        Self { prep_delay,
               step_interval }
    }

    /// Escribe los archivos que el comando declara como salida.
    async fn synthesize_outputs(cmd: &EngineCommand, workdir: &Path) -> Result<(), ExecutionError> {
        if let Some(structure) = cmd.value_of("-o") {
            let content = if structure.ends_with(".tpr") {
                "mock run descriptor\n"
            } else {
                MOCK_STRUCTURE
            };
            tokio::fs::write(workdir.join(structure), content).await?;
        }
        if cmd.verb() == "pdb2gmx" {
            if let Some(topology) = cmd.value_of("-p") {
                tokio::fs::write(workdir.join(topology), MOCK_TOPOLOGY).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EngineProvider for MockEngineProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn description(&self) -> &str {
        "Deterministic mock engine (no external binary)"
    }

    fn substitutes_inputs(&self) -> bool {
        true
    }

    async fn run_buffered(&self,
                          cmd: &EngineCommand,
                          workdir: &Path,
                          _stdin_input: Option<&str>)
                          -> Result<String, ExecutionError> {
        debug!("mock run_buffered: {}", cmd);
        sleep(self.prep_delay).await;
        Self::synthesize_outputs(cmd, workdir).await?;
        Ok(format!("mock {} completed\n", cmd.verb()))
    }

    async fn run_streaming(&self, cmd: &EngineCommand, workdir: &Path) -> Result<EngineStream, ExecutionError> {
        debug!("mock run_streaming: {}", cmd);
        let interval = self.step_interval;
        let final_structure = cmd.value_of("-c").map(|s| workdir.join(s));

        let (tx, rx) = mpsc::channel::<String>(16);
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<String>();

        let task = tokio::spawn(async move {
            for i in 1..=MOCK_PROGRESS_LINES {
                tokio::select! {
                    reason = &mut cancel_rx => {
                        let reason = reason.unwrap_or_else(|_| "stream abandoned".to_string());
                        return Err(ExecutionError::Cancelled(reason));
                    }
                    _ = sleep(interval) => {}
                }

                let step = ASSUMED_TOTAL_STEPS * i / MOCK_PROGRESS_LINES;
                let pct = i * 100 / MOCK_PROGRESS_LINES;
                let line = format!("Step {step}, Progress: {pct}%");
                if tx.send(line).await.is_err() {
                    return Err(ExecutionError::Cancelled("line consumer dropped".to_string()));
                }
            }

            // El engine real deja la estructura final en disco; el mock
            // también, para que la siguiente fase encuentre su entrada.
            if let Some(path) = final_structure {
                tokio::fs::write(path, MOCK_STRUCTURE).await?;
            }
            Ok(())
        });

        Ok(EngineStream::new(rx, task, cancel_tx))
    }
}

//! Secuencia perezosa de líneas de un proceso en ejecución.
//!
//! `run_streaming` crea el proceso y devuelve un [`EngineStream`]: una
//! secuencia finita, no reiniciable, de líneas en el orden de emisión del
//! proceso (stdout y stderr fusionados a granularidad de línea). Agotada la
//! secuencia, `finish` entrega la falla diferida de código de salida como
//! señal fuera de banda, nunca como elemento.
//!
//! Garantías de recursos: el hijo se crea con kill-on-drop y la tarea
//! lectora lo mata y lo cosecha tanto en cancelación explícita como cuando
//! el consumidor abandona la iteración; no quedan zombies ni pipes abiertos.

use std::path::Path;
use std::process::Stdio;

use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::errors::ExecutionError;

use super::command::EngineCommand;

/// Líneas finales retenidas como contexto de diagnóstico de una falla
/// diferida.
const TAIL_LINES: usize = 20;

/// Secuencia de líneas de un proceso (o de un engine simulado) en vuelo.
#[derive(Debug)]
pub struct EngineStream {
    rx: mpsc::Receiver<String>,
    task: JoinHandle<Result<(), ExecutionError>>,
    cancel_tx: Option<oneshot::Sender<String>>,
}

impl EngineStream {
    /// Ensambla un stream desde sus partes. Lo usan el ejecutor real y el
    /// provider mock; la tarea debe terminar el trabajo subyacente cuando
    /// reciba la señal de cancelación.
    pub(crate) fn new(rx: mpsc::Receiver<String>,
                      task: JoinHandle<Result<(), ExecutionError>>,
                      cancel_tx: oneshot::Sender<String>)
                      -> Self {
        Self { rx,
               task,
               cancel_tx: Some(cancel_tx) }
    }

    /// Próxima línea completa, en orden de emisión. `None` cuando el stream
    /// del proceso se cerró; la suspensión ocurre mientras se espera la
    /// siguiente línea.
    pub async fn next_line(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Espera la salida del proceso y entrega la falla diferida si el código
    /// fue distinto de cero. Debe llamarse tras agotar las líneas.
    pub async fn finish(self) -> Result<(), ExecutionError> {
        match self.task.await {
            Ok(result) => result,
            Err(join_err) => Err(ExecutionError::Spawn(std::io::Error::other(join_err))),
        }
    }

    /// Cancela la ejecución en vuelo: el hijo recibe la señal de terminación
    /// y sus recursos se reclaman antes de retornar. Devuelve el error de
    /// cancelación a propagar.
    pub async fn cancel(mut self, reason: &str) -> ExecutionError {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(reason.to_string());
        }
        self.rx.close();
        match self.task.await {
            Ok(Err(e)) => e,
            _ => ExecutionError::Cancelled(reason.to_string()),
        }
    }
}

/// Crea el proceso con stdout/stderr fusionados y lo envuelve en un
/// `EngineStream`. Una tarea propietaria del hijo lee líneas y las publica;
/// si el consumidor desaparece o cancela, la tarea mata y cosecha al hijo.
pub async fn run_streaming(bin: &Path,
                           cmd: &EngineCommand,
                           workdir: &Path)
                           -> Result<EngineStream, ExecutionError> {
    debug!("run_streaming: {} {} (cwd {})", bin.display(), cmd, workdir.display());

    let mut child = Command::new(bin).arg(cmd.verb())
                                     .args(cmd.args())
                                     .current_dir(workdir)
                                     .stdin(Stdio::null())
                                     .stdout(Stdio::piped())
                                     .stderr(Stdio::piped())
                                     .kill_on_drop(true)
                                     .spawn()?;

    let stdout = child.stdout
                      .take()
                      .ok_or_else(|| std::io::Error::other("child stdout unavailable"))?;
    let stderr = child.stderr
                      .take()
                      .ok_or_else(|| std::io::Error::other("child stderr unavailable"))?;

    let (tx, rx) = mpsc::channel::<String>(64);
    let (cancel_tx, mut cancel_rx) = oneshot::channel::<String>();

    let task = tokio::spawn(async move {
        let mut out_lines = BufReader::new(stdout).lines();
        let mut err_lines = BufReader::new(stderr).lines();
        let mut out_open = true;
        let mut err_open = true;
        let mut tail: Vec<String> = Vec::new();

        while out_open || err_open {
            let line = tokio::select! {
                reason = &mut cancel_rx => {
                    let reason = reason.unwrap_or_else(|_| "stream abandoned".to_string());
                    return kill_and_reap(child, reason).await;
                }
                next = out_lines.next_line(), if out_open => match next? {
                    Some(l) => l,
                    None => { out_open = false; continue; }
                },
                next = err_lines.next_line(), if err_open => match next? {
                    Some(l) => l,
                    None => { err_open = false; continue; }
                },
            };

            push_tail(&mut tail, &line);
            if tx.send(line).await.is_err() {
                // El consumidor abandonó la iteración sin cancelar.
                warn!("line consumer dropped, terminating child");
                return kill_and_reap(child, "line consumer dropped".to_string()).await;
            }
        }

        // La cancelación sigue vigente mientras se espera la salida.
        let status = tokio::select! {
            reason = &mut cancel_rx => {
                let reason = reason.unwrap_or_else(|_| "stream abandoned".to_string());
                return kill_and_reap(child, reason).await;
            }
            status = child.wait() => status?,
        };
        match status.code() {
            Some(0) => Ok(()),
            Some(code) => Err(ExecutionError::NonZeroExit { code,
                                                            output: tail.join("\n") }),
            None => Err(ExecutionError::Signalled { output: tail.join("\n") }),
        }
    });

    Ok(EngineStream::new(rx, task, cancel_tx))
}

fn push_tail(tail: &mut Vec<String>, line: &str) {
    if tail.len() == TAIL_LINES {
        tail.remove(0);
    }
    tail.push(line.to_string());
}

async fn kill_and_reap(mut child: tokio::process::Child,
                       reason: String)
                       -> Result<(), ExecutionError> {
    // kill() envía la señal y espera: el hijo deja de existir antes de
    // devolver la cancelación al caller.
    child.kill().await?;
    Err(ExecutionError::Cancelled(reason))
}

//! Construcción y ejecución buffered de comandos del engine.
//!
//! El engine externo acepta una gramática fija `gmx <verbo> -flag valor …`.
//! `EngineCommand` encapsula el verbo y sus argumentos para que tanto el
//! provider real como el mock puedan inspeccionarlos. `run_buffered` crea un
//! proceso por llamada, escribe el stdin opcional (respuestas interactivas,
//! por ejemplo la selección de grupo de solvente), espera la salida y captura
//! stdout+stderr combinados. El proceso se crea con kill-on-drop: no hay
//! fugas en ningún camino de salida.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use log::debug;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::errors::ExecutionError;

/// Timeout del sondeo de versión usado para decidir el modo mock.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Comando del engine: verbo + pares flag/valor en orden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    verb: String,
    args: Vec<String>,
}

impl EngineCommand {
    pub fn new(verb: impl Into<String>) -> Self {
        Self { verb: verb.into(),
               args: Vec::new() }
    }

    /// Agrega `-flag valor`.
    pub fn flag(mut self, flag: &str, value: impl Into<String>) -> Self {
        self.args.push(flag.to_string());
        self.args.push(value.into());
        self
    }

    /// Agrega un flag sin valor (`-v`, `-neutral`, …).
    pub fn switch(mut self, flag: &str) -> Self {
        self.args.push(flag.to_string());
        self
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Valor del flag dado, si está presente (usado por el mock para saber
    /// qué archivos de salida sintetizar).
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.args
            .windows(2)
            .find(|w| w[0] == flag)
            .map(|w| w[1].as_str())
    }
}

impl std::fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.verb, self.args.join(" "))
    }
}

/// Ejecuta un comando y devuelve la salida combinada.
///
/// `stdin_input`, si se provee, se escribe completo y el stream se cierra
/// antes de esperar la salida (respuestas interactivas pre-escritas). Un
/// código de salida distinto de cero produce `ExecutionError::NonZeroExit`
/// con la salida capturada; el caller decide si es fatal.
pub async fn run_buffered(bin: &Path,
                          cmd: &EngineCommand,
                          workdir: &Path,
                          stdin_input: Option<&str>)
                          -> Result<String, ExecutionError> {
    debug!("run_buffered: {} {} (cwd {})", bin.display(), cmd, workdir.display());

    let mut child = Command::new(bin).arg(cmd.verb())
                                     .args(cmd.args())
                                     .current_dir(workdir)
                                     .stdin(if stdin_input.is_some() { Stdio::piped() } else { Stdio::null() })
                                     .stdout(Stdio::piped())
                                     .stderr(Stdio::piped())
                                     .kill_on_drop(true)
                                     .spawn()?;

    if let Some(input) = stdin_input {
        let mut stdin = child.stdin
                             .take()
                             .ok_or_else(|| std::io::Error::other("child stdin unavailable"))?;
        stdin.write_all(input.as_bytes()).await?;
        // Drop cierra el pipe: el hijo ve EOF tras las respuestas.
        drop(stdin);
    }

    let output = child.wait_with_output().await?;
    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if output.status.success() {
        Ok(combined)
    } else {
        match output.status.code() {
            Some(code) => Err(ExecutionError::NonZeroExit { code, output: combined }),
            None => Err(ExecutionError::Signalled { output: combined }),
        }
    }
}

/// Sondea la presencia/respuesta de versión del binario real. Falla cerrado:
/// cualquier error (binario ausente, salida distinta de cero, timeout)
/// devuelve `false` y el orquestador queda en modo mock.
pub async fn probe(bin: &Path) -> bool {
    let fut = async {
        Command::new(bin).arg("--version")
                         .stdin(Stdio::null())
                         .stdout(Stdio::null())
                         .stderr(Stdio::null())
                         .kill_on_drop(true)
                         .status()
                         .await
    };
    match timeout(PROBE_TIMEOUT, fut).await {
        Ok(Ok(status)) => status.success(),
        Ok(Err(_)) | Err(_) => false,
    }
}

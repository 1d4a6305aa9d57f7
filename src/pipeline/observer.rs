//! Costura de observación de una fase en ejecución.
//!
//! El caller provee el sink de líneas (por ejemplo para retransmitir a
//! observadores conectados) y, opcionalmente, el callback de progreso. Ambos
//! se invocan en el orden de emisión del engine y no deben bloquear
//! indefinidamente.

use async_trait::async_trait;

use crate::data::types::ProgressEvent;

/// Observador de líneas y progreso de una fase.
#[async_trait]
pub trait PhaseObserver: Send + Sync {
    /// Una línea completa de salida del engine (o de error fatal).
    async fn on_line(&self, line: &str);

    /// Evento de progreso extraído de una línea (fracción 0..100 junto con
    /// la línea cruda que lo originó). Por defecto, ignorado.
    async fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Observador que descarta todo.
pub struct NullObserver;

#[async_trait]
impl PhaseObserver for NullObserver {
    async fn on_line(&self, _line: &str) {}
}

/// Observador que imprime a stdout (usado por el binario de demostración).
pub struct StdoutObserver;

#[async_trait]
impl PhaseObserver for StdoutObserver {
    async fn on_line(&self, line: &str) {
        println!("{line}");
    }

    async fn on_progress(&self, event: &ProgressEvent) {
        println!("[{}] {:.1}%", event.phase, event.fraction);
    }
}

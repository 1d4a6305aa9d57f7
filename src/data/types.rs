//! Tipos neutrales del pipeline: artifacts, eventos de progreso, resultados
//! terminales de etapa y el estado de la instancia.
//!
//! Un `Artifact` es un archivo nombrado por rol lógico dentro del directorio
//! de trabajo de la instancia; los artifacts forman una cadena acíclica (la
//! entrada estructural de cada fase es la salida de la anterior). El
//! `StageOutcome` es inmutable una vez devuelto.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::phase::Phase;

/// Artifact producido por un paso, con su rol lógico y ruta en disco.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Rol lógico (`structure`, `topology`, `solvated_structure`,
    /// `ionized_structure`, `<fase>_ctrl`, `<fase>_tpr`, `<fase>_output`).
    pub role: String,
    /// Ruta absoluta dentro del directorio de trabajo de la instancia.
    pub path: PathBuf,
}

impl Artifact {
    pub fn new(role: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self { role: role.into(),
               path: path.into() }
    }
}

/// Mapa de artifacts ordenado por inserción (los pasos corren en orden fijo).
pub type ArtifactMap = IndexMap<String, Artifact>;

/// Evento de progreso emitido durante una fase en ejecución. No se persiste;
/// se reenvía al observer del caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub phase: Phase,
    /// Fracción completada, 0..100.
    pub fraction: f64,
    /// Línea cruda del engine que originó el evento.
    pub raw_line: String,
}

/// Resultado terminal de una etapa (preparación o fase). Inmutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcome {
    pub success: bool,
    /// Artifacts registrados como válidos por la etapa.
    pub artifacts: ArtifactMap,
    /// Código de salida del proceso que falló, si aplica.
    pub exit_code: Option<i32>,
    /// Detalle del error (salida capturada), si la etapa falló.
    pub error_detail: Option<String>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
}

impl StageOutcome {
    pub fn success(artifacts: ArtifactMap) -> Self {
        Self { success: true,
               artifacts,
               exit_code: None,
               error_detail: None,
               finished_at: chrono::Utc::now() }
    }

    pub fn failure(exit_code: Option<i32>, error_detail: impl Into<String>) -> Self {
        Self { success: false,
               artifacts: ArtifactMap::new(),
               exit_code,
               error_detail: Some(error_detail.into()),
               finished_at: chrono::Utc::now() }
    }
}

/// Estado de una instancia de pipeline. `Failed` es alcanzable desde
/// cualquier estado no terminal; tras un error fatal la instancia queda en
/// `Failed` y reintentar requiere una instancia nueva.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Idle,
    Preparing,
    Minimizing,
    EquilibratingNvt,
    EquilibratingNpt,
    Producing,
    Completed,
    Failed,
}

impl PipelineState {
    /// Fase que corresponde ejecutar en este estado. La preparación exitosa
    /// deja la instancia en `Preparing`; la primera fase la avanza.
    pub fn expected_phase(&self) -> Option<Phase> {
        match self {
            PipelineState::Preparing => Some(Phase::Minimization),
            PipelineState::Minimizing => Some(Phase::Nvt),
            PipelineState::EquilibratingNvt => Some(Phase::Npt),
            PipelineState::EquilibratingNpt => Some(Phase::Production),
            _ => None,
        }
    }

    /// Estado al que avanza la instancia cuando la fase dada termina bien.
    pub fn after_phase(phase: Phase) -> PipelineState {
        match phase {
            Phase::Minimization => PipelineState::Minimizing,
            Phase::Nvt => PipelineState::EquilibratingNvt,
            Phase::Npt => PipelineState::EquilibratingNpt,
            Phase::Production => PipelineState::Completed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Completed | PipelineState::Failed)
    }

    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::Idle => "Idle",
            PipelineState::Preparing => "Preparing",
            PipelineState::Minimizing => "Minimizing",
            PipelineState::EquilibratingNvt => "EquilibratingNVT",
            PipelineState::EquilibratingNpt => "EquilibratingNPT",
            PipelineState::Producing => "Producing",
            PipelineState::Completed => "Completed",
            PipelineState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_phase_chain() {
        assert_eq!(PipelineState::Preparing.expected_phase(), Some(Phase::Minimization));
        assert_eq!(PipelineState::Minimizing.expected_phase(), Some(Phase::Nvt));
        assert_eq!(PipelineState::EquilibratingNvt.expected_phase(), Some(Phase::Npt));
        assert_eq!(PipelineState::EquilibratingNpt.expected_phase(), Some(Phase::Production));
        assert_eq!(PipelineState::Idle.expected_phase(), None);
        assert_eq!(PipelineState::Completed.expected_phase(), None);
        assert_eq!(PipelineState::Failed.expected_phase(), None);
    }

    #[test]
    fn test_after_phase_terminal_on_production() {
        assert_eq!(PipelineState::after_phase(Phase::Production), PipelineState::Completed);
        assert!(PipelineState::Completed.is_terminal());
        assert!(!PipelineState::Producing.is_terminal());
    }

    #[test]
    fn test_stage_outcome_constructors() {
        let ok = StageOutcome::success(ArtifactMap::new());
        assert!(ok.success);
        assert!(ok.error_detail.is_none());

        let failed = StageOutcome::failure(Some(1), "bad topology");
        assert!(!failed.success);
        assert_eq!(failed.exit_code, Some(1));
        assert_eq!(failed.error_detail.as_deref(), Some("bad topology"));
        assert!(failed.artifacts.is_empty());
    }
}

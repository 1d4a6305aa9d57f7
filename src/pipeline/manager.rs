//! Orquestador principal del pipeline de simulación.
//! Se encarga de:
//! - Mantener el estado explícito de la instancia (máquina de estados
//!   Idle → Preparing → fases → Completed, con Failed desde cualquier
//!   estado no terminal).
//! - Ejecutar la preparación en orden fijo: topología, solvatación
//!   condicional, iones condicionales, generación de archivos de control.
//! - Ejecutar cada fase: resolución del artifact de entrada, preprocessing
//!   buffered, ejecución streaming con reenvío de líneas y progreso al
//!   observer, y chequeo de la falla diferida de salida.
//! - Registrar artifacts por rol y llevar `last_structure` en la instancia
//!   (el sondeo del filesystem es sólo fallback para instancias recién
//!   construidas sobre un directorio ya preparado).
//!
//! Una instancia es dueña exclusiva de su directorio de trabajo; las fases
//! corren estrictamente en secuencia. Instancias independientes pueden
//! convivir sin estado mutable compartido.

use std::path::{Path, PathBuf};

use log::{error, info, warn};
use tokio::sync::watch;
use uuid::Uuid;

use crate::data::phase::{Phase, PrepStep};
use crate::data::simconfig::SimulationConfig;
use crate::data::types::{Artifact, ArtifactMap, PipelineState, ProgressEvent, StageOutcome};
use crate::errors::{ExecutionError, PipelineError};
use crate::exec::engine::EngineProvider;
use crate::exec::EngineCommand;
use crate::progress::{self, ASSUMED_TOTAL_STEPS};
use crate::templates;

use super::observer::PhaseObserver;

/// Respuesta pre-escrita para la selección interactiva del grupo de solvente
/// durante la adición de iones.
const SOLVENT_GROUP_ANSWER: &str = "13\n";

/// Handle clonable para cancelar la fase en vuelo de una instancia.
#[derive(Clone)]
pub struct CancelHandle {
    tx: watch::Sender<Option<String>>,
}

impl CancelHandle {
    /// Pide la cancelación de la fase en vuelo. El hijo recibe la señal de
    /// terminación; los artifacts ya escritos por la fase quedan en su lugar.
    pub fn cancel(&self, reason: &str) {
        let _ = self.tx.send(Some(reason.to_string()));
    }
}

/// Instancia de pipeline: posee su directorio de trabajo y su backend.
pub struct PipelineManager {
    id: Uuid,
    workdir: PathBuf,
    engine: Box<dyn EngineProvider>,
    state: PipelineState,
    artifacts: ArtifactMap,
    /// Última estructura producida por un paso exitoso (nombre de archivo
    /// dentro del directorio de trabajo). Fuente primaria de verdad para
    /// resolver la entrada de la primera fase.
    last_structure: Option<String>,
    last_outcome: Option<StageOutcome>,
    cancel_tx: watch::Sender<Option<String>>,
    cancel_rx: watch::Receiver<Option<String>>,
}

impl PipelineManager {
    pub fn new(workdir: impl Into<PathBuf>, engine: Box<dyn EngineProvider>) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(None);
        Self { id: Uuid::new_v4(),
               workdir: workdir.into(),
               engine,
               state: PipelineState::Idle,
               artifacts: ArtifactMap::new(),
               last_structure: None,
               last_outcome: None,
               cancel_tx,
               cancel_rx }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Artifacts registrados como válidos hasta el momento.
    pub fn artifacts(&self) -> &ArtifactMap {
        &self.artifacts
    }

    /// Resultado de la última etapa terminada (éxito o falla).
    pub fn last_outcome(&self) -> Option<&StageOutcome> {
        self.last_outcome.as_ref()
    }

    /// Handle para cancelar la fase en vuelo desde otra tarea.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle { tx: self.cancel_tx.clone() }
    }

    /// Etapa de preparación, en orden fijo: topología → solvatación (si
    /// `add_solvent`) → iones (si `add_ions`) → archivos de control de las
    /// cuatro fases. Cualquier paso que falle aborta la preparación entera;
    /// no hay reintento parcial.
    pub async fn run_preparation(&mut self, cfg: &SimulationConfig) -> Result<StageOutcome, PipelineError> {
        if self.state != PipelineState::Idle {
            return Err(PipelineError::InvalidTransition { requested: "preparation".to_string(),
                                                          state: self.state.name().to_string() });
        }
        self.state = PipelineState::Preparing;
        info!("pipeline {}: preparation started in {}", self.id, self.workdir.display());

        let mut stage = ArtifactMap::new();
        match self.prepare_steps(cfg, &mut stage).await {
            Ok(()) => {
                for (role, artifact) in &stage {
                    self.artifacts.insert(role.clone(), artifact.clone());
                }
                let outcome = StageOutcome::success(stage);
                self.last_outcome = Some(outcome.clone());
                info!("pipeline {}: preparation completed ({} artifacts)", self.id, outcome.artifacts.len());
                Ok(outcome)
            }
            Err(err) => {
                error!("pipeline {}: preparation failed: {err}", self.id);
                self.state = PipelineState::Failed;
                self.last_outcome = Some(StageOutcome::failure(err.exit_code(), err.to_string()));
                Err(err)
            }
        }
    }

    async fn prepare_steps(&mut self, cfg: &SimulationConfig, stage: &mut ArtifactMap) -> Result<(), PipelineError> {
        for step in PrepStep::ORDER {
            match step {
                PrepStep::Topology => self.prepare_topology(cfg, stage).await?,
                PrepStep::Solvation if cfg.add_solvent => self.prepare_solvation(stage).await?,
                PrepStep::IonAddition if cfg.add_ions => self.prepare_ion_addition(stage).await?,
                _ => info!("pipeline {}: preparation step {step} skipped by configuration", self.id),
            }
        }

        // Archivos de control de las cuatro fases.
        for phase in Phase::ALL {
            let name = phase.control_file();
            tokio::fs::write(self.workdir.join(&name), templates::render(phase, cfg)).await?;
            self.register(stage, format!("{phase}_ctrl"), &name);
        }
        Ok(())
    }

    /// Topología a partir de la estructura cruda.
    async fn prepare_topology(&mut self, cfg: &SimulationConfig, stage: &mut ArtifactMap) -> Result<(), PipelineError> {
        let input_pdb = match self.find_structure_input()? {
            Some(name) => name,
            None if self.engine.substitutes_inputs() => "input.pdb".to_string(),
            None => return Err(PipelineError::MissingArtifact("no .pdb structure file in working directory".into())),
        };
        let cmd = EngineCommand::new("pdb2gmx").flag("-f", input_pdb)
                                               .flag("-o", "conf.gro")
                                               .flag("-p", "topol.top")
                                               .flag("-ff", cfg.forcefield.clone())
                                               .flag("-water", "tip3p");
        self.engine.run_buffered(&cmd, &self.workdir, None).await?;
        self.register(stage, "structure", "conf.gro");
        self.register(stage, "topology", "topol.top");
        self.last_structure = Some("conf.gro".to_string());
        Ok(())
    }

    /// Caja de simulación y solvatación.
    async fn prepare_solvation(&mut self, stage: &mut ArtifactMap) -> Result<(), PipelineError> {
        let cmd = EngineCommand::new("editconf").flag("-f", "conf.gro")
                                                .flag("-o", "newbox.gro")
                                                .switch("-c")
                                                .flag("-d", "1.0")
                                                .flag("-bt", "cubic");
        self.engine.run_buffered(&cmd, &self.workdir, None).await?;

        let cmd = EngineCommand::new("solvate").flag("-cp", "newbox.gro")
                                               .flag("-cs", "spc216.gro")
                                               .flag("-o", "solv.gro")
                                               .flag("-p", "topol.top");
        self.engine.run_buffered(&cmd, &self.workdir, None).await?;
        self.register(stage, "solvated_structure", "solv.gro");
        self.last_structure = Some("solv.gro".to_string());
        Ok(())
    }

    /// Adición de iones, con respuesta interactiva pre-escrita para elegir
    /// el grupo de solvente.
    async fn prepare_ion_addition(&mut self, stage: &mut ArtifactMap) -> Result<(), PipelineError> {
        tokio::fs::write(self.workdir.join("ions.ctrl"), templates::render_ions()).await?;
        let input = self.last_structure.clone().unwrap_or_else(|| "conf.gro".to_string());
        let cmd = EngineCommand::new("grompp").flag("-f", "ions.ctrl")
                                              .flag("-c", input)
                                              .flag("-p", "topol.top")
                                              .flag("-o", "ions.tpr");
        self.engine.run_buffered(&cmd, &self.workdir, None).await?;

        let cmd = EngineCommand::new("genion").flag("-s", "ions.tpr")
                                              .flag("-o", "ions.gro")
                                              .flag("-p", "topol.top")
                                              .flag("-pname", "NA")
                                              .flag("-nname", "CL")
                                              .switch("-neutral");
        self.engine.run_buffered(&cmd, &self.workdir, Some(SOLVENT_GROUP_ANSWER)).await?;
        self.register(stage, "ionized_structure", "ions.gro");
        self.last_structure = Some("ions.gro".to_string());
        Ok(())
    }

    /// Ejecuta una fase: preprocessing buffered y luego la corrida streaming,
    /// reenviando cada línea al observer en orden y el progreso extraíble al
    /// callback. La falla de salida del streaming se chequea diferida, tras
    /// la última línea.
    pub async fn run_phase(&mut self,
                           phase: Phase,
                           cfg: &SimulationConfig,
                           observer: &dyn PhaseObserver)
                           -> Result<StageOutcome, PipelineError> {
        if self.state.expected_phase() != Some(phase) {
            return Err(PipelineError::InvalidTransition { requested: phase.name().to_string(),
                                                          state: self.state.name().to_string() });
        }

        // Invariante: los artifacts de entrada existen antes de cualquier
        // spawn.
        let input_structure = match self.resolve_input_structure(phase) {
            Ok(name) => name,
            Err(e) => return Err(self.fail(e, observer).await),
        };
        if !self.workdir.join("topol.top").is_file() {
            return Err(self.fail(PipelineError::MissingArtifact("topol.top".into()), observer).await);
        }

        let ctrl = phase.control_file();
        let ctrl_path = self.workdir.join(&ctrl);
        if !ctrl_path.is_file() {
            if let Err(e) = tokio::fs::write(&ctrl_path, templates::render(phase, cfg)).await {
                return Err(self.fail(e.into(), observer).await);
            }
        }

        self.state = running_state(phase);
        info!("pipeline {}: {phase} started (input {input_structure})", self.id);

        // Snapshot del canal de cancelación al entrar a la fase: una
        // cancelación pedida durante el preprocessing se aplica antes de
        // lanzar la corrida larga.
        let mut cancel_rx = self.cancel_rx.clone();
        cancel_rx.borrow_and_update();

        // Preprocessing: compila control + estructura en el descriptor
        // ejecutable. Si falla, la corrida nunca se lanza.
        let prefix = phase.output_prefix();
        let grompp = EngineCommand::new("grompp").flag("-f", ctrl.clone())
                                                 .flag("-c", input_structure)
                                                 .flag("-p", "topol.top")
                                                 .flag("-o", phase.run_descriptor());
        if let Err(e) = self.engine.run_buffered(&grompp, &self.workdir, None).await {
            return Err(self.fail(e.into(), observer).await);
        }

        if cancel_rx.has_changed().unwrap_or(false) {
            let reason = cancel_rx.borrow_and_update()
                                  .clone()
                                  .unwrap_or_else(|| "cancelled by caller".to_string());
            warn!("pipeline {}: {phase} cancelled before execution: {reason}", self.id);
            return Err(self.fail(ExecutionError::Cancelled(reason).into(), observer).await);
        }

        let mut stage = ArtifactMap::new();
        self.register(&mut stage, format!("{phase}_ctrl"), &ctrl);
        self.register(&mut stage, format!("{phase}_tpr"), phase.run_descriptor());

        // Corrida streaming con flags de GPU/hilos de la configuración.
        let mut mdrun = EngineCommand::new("mdrun").flag("-s", phase.run_descriptor())
                                                   .flag("-o", format!("{prefix}.trr"))
                                                   .flag("-c", format!("{prefix}.gro"))
                                                   .flag("-e", format!("{prefix}.edr"))
                                                   .flag("-g", format!("{prefix}.log"))
                                                   .switch("-v")
                                                   .flag("-nb", if cfg.gpu_enabled { "gpu" } else { "cpu" });
        if let Some(ntomp) = cfg.ntomp {
            mdrun = mdrun.flag("-ntomp", ntomp.to_string());
        }
        if let Some(ntmpi) = cfg.ntmpi {
            mdrun = mdrun.flag("-ntmpi", ntmpi.to_string());
        }

        let mut stream = match self.engine.run_streaming(&mdrun, &self.workdir).await {
            Ok(stream) => stream,
            Err(e) => return Err(self.fail(e.into(), observer).await),
        };

        let mut cancel_alive = true;

        loop {
            tokio::select! {
                changed = cancel_rx.changed(), if cancel_alive => {
                    if changed.is_err() {
                        cancel_alive = false;
                        continue;
                    }
                    let reason = cancel_rx.borrow()
                                          .clone()
                                          .unwrap_or_else(|| "cancelled by caller".to_string());
                    warn!("pipeline {}: {phase} cancelled: {reason}", self.id);
                    let err = stream.cancel(&reason).await;
                    return Err(self.fail(err.into(), observer).await);
                }
                line = stream.next_line() => match line {
                    Some(line) => {
                        observer.on_line(&line).await;
                        if let Some(fraction) = progress::extract(&line, ASSUMED_TOTAL_STEPS) {
                            let event = ProgressEvent { phase,
                                                        fraction,
                                                        raw_line: line };
                            observer.on_progress(&event).await;
                        }
                    }
                    None => break,
                }
            }
        }

        // Falla diferida de código de salida, fuera de banda tras la última
        // línea.
        if let Err(e) = stream.finish().await {
            return Err(self.fail(e.into(), observer).await);
        }

        self.register(&mut stage, format!("{phase}_output"), phase.output_structure());
        for (role, artifact) in &stage {
            self.artifacts.insert(role.clone(), artifact.clone());
        }
        self.last_structure = Some(phase.output_structure());
        self.state = PipelineState::after_phase(phase);

        observer.on_line(&format!("{phase} simulation completed successfully")).await;
        info!("pipeline {}: {phase} completed, state {}", self.id, self.state);

        let outcome = StageOutcome::success(stage);
        self.last_outcome = Some(outcome.clone());
        Ok(outcome)
    }

    /// Resuelve la estructura de entrada de la fase. La primera fase
    /// prefiere la estructura con iones, luego la solvatada, luego la cruda;
    /// las siguientes consumen siempre la salida de la fase anterior.
    fn resolve_input_structure(&self, phase: Phase) -> Result<String, PipelineError> {
        match phase.input_structure() {
            Some(name) => {
                if self.workdir.join(&name).is_file() {
                    Ok(name)
                } else {
                    Err(PipelineError::MissingArtifact(name))
                }
            }
            None => {
                // Estado explícito primero; sondeo del filesystem sólo como
                // fallback para instancias recién cargadas.
                if let Some(last) = &self.last_structure {
                    if self.workdir.join(last).is_file() {
                        return Ok(last.clone());
                    }
                }
                for candidate in ["ions.gro", "solv.gro", "conf.gro"] {
                    if self.workdir.join(candidate).is_file() {
                        return Ok(candidate.to_string());
                    }
                }
                Err(PipelineError::MissingArtifact("conf.gro".into()))
            }
        }
    }

    /// Marca la instancia como fallida, reenvía el detalle textual al
    /// observer y registra el outcome terminal. Devuelve el error para
    /// propagarlo al caller.
    async fn fail(&mut self, err: PipelineError, observer: &dyn PhaseObserver) -> PipelineError {
        let detail = match &err {
            PipelineError::Execution(e) if !e.captured_output().is_empty() => e.captured_output().to_string(),
            other => other.to_string(),
        };
        observer.on_line(&detail).await;
        error!("pipeline {}: failed: {err}", self.id);
        self.state = PipelineState::Failed;
        self.last_outcome = Some(StageOutcome::failure(err.exit_code(), detail));
        err
    }

    fn register(&self, stage: &mut ArtifactMap, role: impl Into<String>, file: impl AsRef<str>) {
        let role = role.into();
        let artifact = Artifact::new(role.clone(), self.workdir.join(file.as_ref()));
        stage.insert(role, artifact);
    }

    /// Primer archivo `.pdb` del directorio de trabajo, si hay.
    fn find_structure_input(&self) -> Result<Option<String>, PipelineError> {
        let entries = match std::fs::read_dir(&self.workdir) {
            Ok(entries) => entries,
            Err(e) => return Err(PipelineError::Io(e)),
        };
        let mut pdbs: Vec<String> = entries.flatten()
                                           .filter_map(|e| {
                                               let name = e.file_name().to_string_lossy().to_string();
                                               name.ends_with(".pdb").then_some(name)
                                           })
                                           .collect();
        pdbs.sort();
        Ok(pdbs.into_iter().next())
    }
}

/// Estado activo mientras corre la fase dada.
fn running_state(phase: Phase) -> PipelineState {
    match phase {
        Phase::Minimization => PipelineState::Minimizing,
        Phase::Nvt => PipelineState::EquilibratingNvt,
        Phase::Npt => PipelineState::EquilibratingNpt,
        Phase::Production => PipelineState::Producing,
    }
}

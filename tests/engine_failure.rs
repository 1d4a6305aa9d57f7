//! Integración con un binario de engine simulado por script: propagación de
//! fallas del preprocessing con su salida capturada.

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use gmxflow_rust::data::{Phase, PipelineState, SimulationConfig};
use gmxflow_rust::errors::PipelineError;
use gmxflow_rust::exec::GmxEngineProvider;
use gmxflow_rust::pipeline::{PhaseObserver, PipelineManager};

#[derive(Default)]
struct Recorder {
    lines: Mutex<Vec<String>>,
}

#[async_trait]
impl PhaseObserver for Recorder {
    async fn on_line(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}

/// Escribe un stub ejecutable que se comporta como el engine: los pasos de
/// preparación escriben sus salidas, el preprocessing falla con diagnóstico
/// en stderr y la corrida larga deja una marca si alguna vez se lanza.
fn write_stub_engine(dir: &std::path::Path) -> PathBuf {
    let path = dir.join("gmx");
    let script = "#!/bin/sh\n\
                  case \"$1\" in\n\
                    pdb2gmx) touch conf.gro topol.top ;;\n\
                    grompp) echo 'bad topology' >&2; exit 1 ;;\n\
                    mdrun) touch mdrun_ran ;;\n\
                  esac\n\
                  exit 0\n";
    std::fs::write(&path, script).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

#[tokio::test]
async fn test_grompp_failure_forwards_stderr_and_skips_mdrun() {
    let bin_dir = tempfile::tempdir().unwrap();
    let workdir = tempfile::tempdir().unwrap();
    let gmx = write_stub_engine(bin_dir.path());
    std::fs::write(workdir.path().join("input.pdb"), "ATOM\n").unwrap();

    let mut manager = PipelineManager::new(workdir.path(), Box::new(GmxEngineProvider::new(gmx)));
    let cfg = SimulationConfig { add_solvent: false,
                                 add_ions: false,
                                 ..SimulationConfig::default() };

    manager.run_preparation(&cfg).await.unwrap();

    let recorder = Recorder::default();
    let err = manager.run_phase(Phase::Minimization, &cfg, &recorder)
                     .await
                     .unwrap_err();

    // El código de salida y la salida capturada sobreviven intactos.
    assert_eq!(err.exit_code(), Some(1));
    assert!(matches!(err, PipelineError::Execution(_)));

    let lines = recorder.lines.lock().unwrap().clone();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].trim_end(), "bad topology");

    assert_eq!(manager.state(), PipelineState::Failed);
    let outcome = manager.last_outcome().unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.exit_code, Some(1));
    assert!(outcome.error_detail.as_deref().unwrap().contains("bad topology"));

    // La corrida larga nunca se lanzó.
    assert!(!workdir.path().join("mdrun_ran").exists());
}

#[tokio::test]
async fn test_preparation_failure_aborts_remaining_steps() {
    let bin_dir = tempfile::tempdir().unwrap();
    let workdir = tempfile::tempdir().unwrap();
    let path = bin_dir.path().join("gmx");
    // pdb2gmx falla de entrada: la preparación aborta sin escribir controles.
    let script = "#!/bin/sh\necho 'residue UNK not found' >&2\nexit 1\n";
    std::fs::write(&path, script).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    std::fs::write(workdir.path().join("input.pdb"), "ATOM\n").unwrap();

    let mut manager = PipelineManager::new(workdir.path(), Box::new(GmxEngineProvider::new(path)));
    let cfg = SimulationConfig::default();

    let err = manager.run_preparation(&cfg).await.unwrap_err();
    assert_eq!(err.exit_code(), Some(1));
    assert_eq!(manager.state(), PipelineState::Failed);
    assert!(manager.artifacts().is_empty());
    assert!(!workdir.path().join(Phase::Minimization.control_file()).exists());
}

#[tokio::test]
async fn test_preparation_requires_structure_file() {
    let bin_dir = tempfile::tempdir().unwrap();
    let workdir = tempfile::tempdir().unwrap();
    let gmx = write_stub_engine(bin_dir.path());

    let mut manager = PipelineManager::new(workdir.path(), Box::new(GmxEngineProvider::new(gmx)));
    let cfg = SimulationConfig::default();

    // Sin archivo .pdb el engine real no tiene con qué empezar.
    let err = manager.run_preparation(&cfg).await.unwrap_err();
    assert!(matches!(err, PipelineError::MissingArtifact(_)));
    assert_eq!(manager.state(), PipelineState::Failed);
}

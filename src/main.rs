//! Binario de demostración: corre el pipeline completo de punta a punta en
//! un directorio temporal, imprimiendo líneas y progreso por stdout. Sin el
//! binario del engine instalado cae al modo mock y termina en segundos.

use std::collections::HashMap;
use std::time::Duration;

use log::info;
use serde_json::json;

use gmxflow_rust::config::CONFIG;
use gmxflow_rust::data::Phase;
use gmxflow_rust::exec::{select_engine, EngineProvider, MockEngineProvider};
use gmxflow_rust::forcefield::{discover_forcefields, mock_forcefields};
use gmxflow_rust::pipeline::{PipelineManager, StdoutObserver};
use gmxflow_rust::resolver;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    env_logger::init();

    let workdir = std::env::temp_dir().join(format!("gmxflow-demo-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&workdir)?;
    info!("demo workdir: {}", workdir.display());

    let engine = select_engine(&CONFIG.engine).await;
    let engine: Box<dyn EngineProvider> = if engine.name() == "mock" {
        // Demoras cortas para que la demo no tarde minutos.
        Box::new(MockEngineProvider::with_delays(Duration::from_millis(50), Duration::from_millis(100)))
    } else {
        engine
    };
    println!("engine backend: {}", engine.description());

    let forcefields = if engine.name() == "mock" {
        mock_forcefields()
    } else {
        discover_forcefields(&CONFIG.engine.force_fields_path)
    };
    for ff in &forcefields {
        println!("forcefield {}: {}", ff.name, ff.description);
    }

    // La configuración llega como mapa crudo y se valida una sola vez.
    let raw: HashMap<String, serde_json::Value> =
        [("total_time".to_string(), json!(1.0)), ("temperature".to_string(), json!(300.0))].into();
    let cfg = resolver::resolve(&raw, &forcefields)?;
    let mut manager = PipelineManager::new(&workdir, engine);

    println!("--- preparation ---");
    let outcome = manager.run_preparation(&cfg).await?;
    for (role, artifact) in &outcome.artifacts {
        println!("artifact {role}: {}", artifact.path.display());
    }

    let observer = StdoutObserver;
    for phase in Phase::ALL {
        println!("--- {phase} ---");
        manager.run_phase(phase, &cfg, &observer).await?;
    }

    println!("final state: {}", manager.state());
    let _ = std::fs::remove_dir_all(&workdir);
    Ok(())
}

//! Generación de archivos de control por fase.
//!
//! Función pura: (fase, configuración) → texto determinista del archivo de
//! parámetros que consume el engine. Escribirlo al directorio de trabajo es
//! responsabilidad del orquestador, nunca de este módulo.
//!
//! Sustituciones numéricas garantizadas:
//! - `ref_t` / `ref_p` toman temperatura y presión de la configuración.
//! - Producción: `nsteps = round(total_ns * 1000 / dt_ps)` con el dt
//!   configurado (tiempo total = pasos × dt se conserva exacto).
//! - NVT/NPT usan un número de pasos de equilibración fijo, independiente
//!   del tiempo total configurado.
//! - Producción suprime la trayectoria completa (nstxout/nstvout/nstfout = 0)
//!   y conserva salida comprimida y de energías a intervalo fijo.

use crate::data::phase::Phase;
use crate::data::simconfig::SimulationConfig;

/// Pasos fijos de equilibración NVT/NPT (100 ps a dt = 0.002).
pub const EQUILIBRATION_STEPS: u64 = 50_000;
/// Pasos máximos de minimización.
pub const MINIMIZATION_STEPS: u64 = 50_000;
/// Intervalo de salida comprimida/energías en producción.
pub const PRODUCTION_OUTPUT_INTERVAL: u64 = 5_000;

/// Renderiza el archivo de control de una fase.
pub fn render(phase: Phase, cfg: &SimulationConfig) -> String {
    match phase {
        Phase::Minimization => render_minimization(),
        Phase::Nvt => render_nvt(cfg),
        Phase::Npt => render_npt(cfg),
        Phase::Production => render_production(cfg),
    }
}

/// Archivo de control para compilar el descriptor de adición de iones
/// (descenso más pronunciado mínimo; sólo se usa para generar `ions.tpr`).
pub fn render_ions() -> String {
    "; ions.ctrl - for adding ions\n\
     integrator  = steep\n\
     emtol       = 1000.0\n\
     emstep      = 0.01\n\
     nsteps      = 50000\n\
     nstlist     = 1\n\
     cutoff-scheme   = Verlet\n\
     ns_type     = grid\n\
     coulombtype = cutoff\n\
     rcoulomb    = 1.0\n\
     rvdw        = 1.0\n\
     pbc         = xyz\n"
        .to_string()
}

fn render_minimization() -> String {
    format!("; minimization.ctrl - Energy minimization\n\
             integrator  = steep\n\
             emtol       = 1000.0\n\
             emstep      = 0.01\n\
             nsteps      = {MINIMIZATION_STEPS}\n\
             \n\
             nstlist     = 1\n\
             cutoff-scheme   = Verlet\n\
             ns_type     = grid\n\
             coulombtype = PME\n\
             rcoulomb    = 1.0\n\
             rvdw        = 1.0\n\
             pbc         = xyz\n")
}

/// Bloque común de vecinos/electrostática de las fases dinámicas.
fn dynamics_common() -> &'static str {
    "cutoff-scheme           = Verlet\n\
     ns_type                 = grid\n\
     nstlist                 = 10\n\
     rcoulomb                = 1.0\n\
     rvdw                    = 1.0\n\
     \n\
     coulombtype             = PME\n\
     pme_order               = 4\n\
     fourierspacing          = 0.16\n\
     \n\
     tcoupl                  = V-rescale\n\
     tc-grps                 = Protein Non-Protein\n\
     tau_t                   = 0.1     0.1\n"
}

fn render_nvt(cfg: &SimulationConfig) -> String {
    format!("; nvt.ctrl - NVT equilibration\n\
             define                  = -DPOSRES\n\
             integrator              = md\n\
             nsteps                  = {steps}\n\
             dt                      = 0.002\n\
             nstxout                 = 500\n\
             nstvout                 = 500\n\
             nstenergy               = 500\n\
             nstlog                  = 500\n\
             nstxout-compressed      = 500\n\
             \n\
             {common}\
             ref_t                   = {t}    {t}\n\
             \n\
             pcoupl                  = no\n\
             pbc                     = xyz\n",
            steps = EQUILIBRATION_STEPS,
            common = dynamics_common(),
            t = cfg.temperature_k)
}

fn render_npt(cfg: &SimulationConfig) -> String {
    format!("; npt.ctrl - NPT equilibration\n\
             define                  = -DPOSRES\n\
             integrator              = md\n\
             nsteps                  = {steps}\n\
             dt                      = 0.002\n\
             nstxout                 = 500\n\
             nstvout                 = 500\n\
             nstenergy               = 500\n\
             nstlog                  = 500\n\
             nstxout-compressed      = 500\n\
             \n\
             {common}\
             ref_t                   = {t}    {t}\n\
             \n\
             pcoupl                  = Parrinello-Rahman\n\
             pcoupltype              = isotropic\n\
             tau_p                   = 2.0\n\
             ref_p                   = {p}\n\
             compressibility         = 4.5e-5\n\
             \n\
             pbc                     = xyz\n",
            steps = EQUILIBRATION_STEPS,
            common = dynamics_common(),
            t = cfg.temperature_k,
            p = cfg.pressure_bar)
}

fn render_production(cfg: &SimulationConfig) -> String {
    format!("; production.ctrl - Production MD simulation\n\
             integrator              = md\n\
             nsteps                  = {steps}\n\
             dt                      = {dt}\n\
             nstxout                 = 0\n\
             nstvout                 = 0\n\
             nstfout                 = 0\n\
             nstenergy               = {out}\n\
             nstlog                  = {out}\n\
             nstxout-compressed      = {out}\n\
             \n\
             {common}\
             ref_t                   = {t}    {t}\n\
             \n\
             pcoupl                  = Parrinello-Rahman\n\
             pcoupltype              = isotropic\n\
             tau_p                   = 2.0\n\
             ref_p                   = {p}\n\
             compressibility         = 4.5e-5\n\
             \n\
             pbc                     = xyz\n\
             gen_vel                 = no\n",
            steps = cfg.production_steps(),
            dt = cfg.time_step_ps,
            out = PRODUCTION_OUTPUT_INTERVAL,
            common = dynamics_common(),
            t = cfg.temperature_k,
            p = cfg.pressure_bar)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_value(text: &str, key: &str) -> Option<String> {
        text.lines()
            .find(|l| l.trim_start().starts_with(key))
            .and_then(|l| l.split('=').nth(1))
            .map(|v| v.trim().to_string())
    }

    #[test]
    fn test_production_step_count_embeds_relation() {
        let cfg = SimulationConfig { total_time_ns: 2.5,
                                     time_step_ps: 0.002,
                                     ..SimulationConfig::default() };
        let text = render(Phase::Production, &cfg);
        // round(2.5 * 1000 / 0.002) = 1_250_000
        assert_eq!(line_value(&text, "nsteps").as_deref(), Some("1250000"));
        assert_eq!(line_value(&text, "dt").as_deref(), Some("0.002"));
    }

    #[test]
    fn test_production_suppresses_full_trajectory() {
        let text = render(Phase::Production, &SimulationConfig::default());
        assert_eq!(line_value(&text, "nstxout").as_deref(), Some("0"));
        assert_eq!(line_value(&text, "nstvout").as_deref(), Some("0"));
        assert_eq!(line_value(&text, "nstfout").as_deref(), Some("0"));
        assert_eq!(line_value(&text, "nstxout-compressed").as_deref(), Some("5000"));
        assert_eq!(line_value(&text, "nstenergy").as_deref(), Some("5000"));
    }

    #[test]
    fn test_equilibration_steps_independent_of_total_time() {
        let short = SimulationConfig { total_time_ns: 0.1,
                                       ..SimulationConfig::default() };
        let long = SimulationConfig { total_time_ns: 500.0,
                                      ..SimulationConfig::default() };
        for phase in [Phase::Nvt, Phase::Npt] {
            let a = render(phase, &short);
            let b = render(phase, &long);
            assert_eq!(line_value(&a, "nsteps").as_deref(), Some("50000"));
            assert_eq!(a, b, "{phase} no depende del tiempo total");
        }
    }

    #[test]
    fn test_thermostat_and_barostat_reference_values() {
        let cfg = SimulationConfig { temperature_k: 310.0,
                                     pressure_bar: 1.5,
                                     ..SimulationConfig::default() };
        let nvt = render(Phase::Nvt, &cfg);
        assert_eq!(line_value(&nvt, "ref_t").as_deref(), Some("310    310"));
        assert!(line_value(&nvt, "ref_p").is_none(), "NVT no acopla presión");

        let npt = render(Phase::Npt, &cfg);
        assert_eq!(line_value(&npt, "ref_t").as_deref(), Some("310    310"));
        assert_eq!(line_value(&npt, "ref_p").as_deref(), Some("1.5"));

        let prod = render(Phase::Production, &cfg);
        assert_eq!(line_value(&prod, "ref_p").as_deref(), Some("1.5"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let cfg = SimulationConfig::default();
        for phase in Phase::ALL {
            assert_eq!(render(phase, &cfg), render(phase, &cfg));
        }
        assert_eq!(render_ions(), render_ions());
    }
}

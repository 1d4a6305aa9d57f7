//! Configuración tipada e inmutable de una simulación.
//!
//! Reemplaza el paso de mapas dinámicos de extremo a extremo: el resolver
//! valida una sola vez y el resto de los componentes reciben esta estructura,
//! nunca mapas crudos.

use serde::{Deserialize, Serialize};

/// Valores por defecto (idénticos a los del servicio original).
pub const DEFAULT_TEMPERATURE_K: f64 = 300.0;
pub const DEFAULT_PRESSURE_BAR: f64 = 1.0;
pub const DEFAULT_TIME_STEP_PS: f64 = 0.002;
pub const DEFAULT_TOTAL_TIME_NS: f64 = 10.0;
pub const DEFAULT_FORCEFIELD: &str = "amber99sb-ildn";

/// Configuración validada de una simulación. Inmutable una vez resuelta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Identificador del campo de fuerzas (validado contra el descubrimiento).
    pub forcefield: String,
    /// Temperatura de referencia del termostato, en Kelvin (> 0).
    pub temperature_k: f64,
    /// Presión de referencia del barostato, en bar (> 0).
    pub pressure_bar: f64,
    /// Paso de integración, en picosegundos (> 0).
    pub time_step_ps: f64,
    /// Tiempo total simulado de la fase de producción, en nanosegundos (>= 0).
    pub total_time_ns: f64,
    /// Ejecutar el cálculo no enlazado en GPU.
    pub gpu_enabled: bool,
    /// Hilos OpenMP por rango (flag -ntomp), opcional.
    pub ntomp: Option<u32>,
    /// Rangos thread-MPI (flag -ntmpi), opcional.
    pub ntmpi: Option<u32>,
    /// Ejecutar el paso de solvatación durante la preparación.
    pub add_solvent: bool,
    /// Ejecutar la adición de iones durante la preparación.
    pub add_ions: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { forcefield: DEFAULT_FORCEFIELD.to_string(),
               temperature_k: DEFAULT_TEMPERATURE_K,
               pressure_bar: DEFAULT_PRESSURE_BAR,
               time_step_ps: DEFAULT_TIME_STEP_PS,
               total_time_ns: DEFAULT_TOTAL_TIME_NS,
               gpu_enabled: true,
               ntomp: None,
               ntmpi: None,
               add_solvent: true,
               add_ions: true }
    }
}

impl SimulationConfig {
    /// Número de pasos de producción: round(total_ns * 1000 / dt_ps).
    /// Preserva la relación tiempo total = pasos × dt con el dt configurado.
    pub fn production_steps(&self) -> u64 {
        (self.total_time_ns * 1000.0 / self.time_step_ps).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = SimulationConfig::default();
        assert_eq!(cfg.forcefield, "amber99sb-ildn");
        assert_eq!(cfg.temperature_k, 300.0);
        assert_eq!(cfg.pressure_bar, 1.0);
        assert_eq!(cfg.time_step_ps, 0.002);
        assert_eq!(cfg.total_time_ns, 10.0);
        assert!(cfg.gpu_enabled);
        assert!(cfg.add_solvent);
        assert!(cfg.add_ions);
    }

    #[test]
    fn test_production_steps_relation() {
        let cfg = SimulationConfig::default();
        // 10 ns a 0.002 ps por paso => 5_000_000 pasos
        assert_eq!(cfg.production_steps(), 5_000_000);

        let cfg = SimulationConfig { total_time_ns: 1.0,
                                     time_step_ps: 0.004,
                                     ..SimulationConfig::default() };
        assert_eq!(cfg.production_steps(), 250_000);
        // La relación exacta se conserva: pasos * dt == tiempo total en ps
        assert_eq!(cfg.production_steps() as f64 * cfg.time_step_ps, cfg.total_time_ns * 1000.0);
    }
}

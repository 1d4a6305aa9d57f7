//! Resolución y validación de configuración cruda.
//!
//! Convierte el mapa dinámico recibido del exterior en una
//! [`SimulationConfig`] tipada, aplicando defaults y validando una sola vez.
//! Los componentes aguas abajo nunca ven mapas crudos. Sin efectos
//! secundarios.

use std::collections::HashMap;

use serde_json::Value;

use crate::data::simconfig::{self, SimulationConfig};
use crate::errors::PipelineError;
use crate::forcefield::ForceField;

/// Resuelve un mapa crudo clave→valor en una configuración validada.
///
/// Reglas:
/// - Campo numérico ausente → default; presente pero no positivo → error.
/// - `total_time` admite 0 (una producción vacía es válida).
/// - El campo de fuerzas debe estar en la lista descubierta.
pub fn resolve(raw: &HashMap<String, Value>,
               known_forcefields: &[ForceField])
               -> Result<SimulationConfig, PipelineError> {
    let forcefield = match raw.get("forcefield") {
        Some(v) => v.as_str()
                    .ok_or_else(|| PipelineError::Configuration("forcefield must be a string".into()))?
                    .to_string(),
        None => simconfig::DEFAULT_FORCEFIELD.to_string(),
    };
    if !known_forcefields.iter().any(|ff| ff.name == forcefield) {
        return Err(PipelineError::Configuration(format!("unknown forcefield: {forcefield}")));
    }

    let temperature_k = positive_field(raw, "temperature", simconfig::DEFAULT_TEMPERATURE_K)?;
    let pressure_bar = positive_field(raw, "pressure", simconfig::DEFAULT_PRESSURE_BAR)?;
    let time_step_ps = positive_field(raw, "time_step", simconfig::DEFAULT_TIME_STEP_PS)?;
    let total_time_ns = non_negative_field(raw, "total_time", simconfig::DEFAULT_TOTAL_TIME_NS)?;

    Ok(SimulationConfig { forcefield,
                          temperature_k,
                          pressure_bar,
                          time_step_ps,
                          total_time_ns,
                          gpu_enabled: bool_field(raw, "gpu_enabled", true)?,
                          ntomp: thread_field(raw, "ntomp")?,
                          ntmpi: thread_field(raw, "ntmpi")?,
                          add_solvent: bool_field(raw, "add_solvent", true)?,
                          add_ions: bool_field(raw, "add_ions", true)? })
}

fn numeric(raw: &HashMap<String, Value>, key: &str) -> Result<Option<f64>, PipelineError> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_f64()
                    .map(Some)
                    .ok_or_else(|| PipelineError::Configuration(format!("{key} must be numeric"))),
    }
}

fn positive_field(raw: &HashMap<String, Value>, key: &str, default: f64) -> Result<f64, PipelineError> {
    match numeric(raw, key)? {
        Some(v) if v > 0.0 => Ok(v),
        Some(v) => Err(PipelineError::Configuration(format!("{key} must be positive, got {v}"))),
        None => Ok(default),
    }
}

fn non_negative_field(raw: &HashMap<String, Value>, key: &str, default: f64) -> Result<f64, PipelineError> {
    match numeric(raw, key)? {
        Some(v) if v >= 0.0 => Ok(v),
        Some(v) => Err(PipelineError::Configuration(format!("{key} must not be negative, got {v}"))),
        None => Ok(default),
    }
}

fn bool_field(raw: &HashMap<String, Value>, key: &str, default: bool) -> Result<bool, PipelineError> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(v) => v.as_bool()
                    .ok_or_else(|| PipelineError::Configuration(format!("{key} must be a boolean"))),
    }
}

fn thread_field(raw: &HashMap<String, Value>, key: &str) -> Result<Option<u32>, PipelineError> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => match v.as_u64() {
            Some(n) if n > 0 && n <= u32::MAX as u64 => Ok(Some(n as u32)),
            _ => Err(PipelineError::Configuration(format!("{key} must be a positive integer"))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forcefield::mock_forcefields;
    use serde_json::json;

    fn raw(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_empty_map_yields_defaults() {
        let cfg = resolve(&HashMap::new(), &mock_forcefields()).unwrap();
        assert_eq!(cfg.forcefield, "amber99sb-ildn");
        assert_eq!(cfg.temperature_k, 300.0);
        assert_eq!(cfg.pressure_bar, 1.0);
        assert_eq!(cfg.time_step_ps, 0.002);
        assert_eq!(cfg.total_time_ns, 10.0);
        assert!(cfg.gpu_enabled);
        assert_eq!(cfg.ntomp, None);
    }

    #[test]
    fn test_supplied_values_override_defaults() {
        let m = raw(&[("temperature", json!(310.0)),
                      ("pressure", json!(1.5)),
                      ("gpu_enabled", json!(false)),
                      ("ntomp", json!(8)),
                      ("add_solvent", json!(false))]);
        let cfg = resolve(&m, &mock_forcefields()).unwrap();
        assert_eq!(cfg.temperature_k, 310.0);
        assert_eq!(cfg.pressure_bar, 1.5);
        assert!(!cfg.gpu_enabled);
        assert_eq!(cfg.ntomp, Some(8));
        assert!(!cfg.add_solvent);
        assert!(cfg.add_ions);
    }

    #[test]
    fn test_non_positive_numeric_rejected() {
        for key in ["temperature", "pressure", "time_step"] {
            let m = raw(&[(key, json!(0.0))]);
            let err = resolve(&m, &mock_forcefields()).unwrap_err();
            assert!(matches!(err, PipelineError::Configuration(_)), "{key}");
        }
        // total_time = 0 es válido; negativo no.
        let m = raw(&[("total_time", json!(0.0))]);
        assert!(resolve(&m, &mock_forcefields()).is_ok());
        let m = raw(&[("total_time", json!(-1.0))]);
        assert!(resolve(&m, &mock_forcefields()).is_err());
    }

    #[test]
    fn test_unknown_forcefield_rejected() {
        let m = raw(&[("forcefield", json!("martini3"))]);
        let err = resolve(&m, &mock_forcefields()).unwrap_err();
        assert_eq!(err.to_string(), "configuration error: unknown forcefield: martini3");
    }

    #[test]
    fn test_wrong_types_rejected() {
        let m = raw(&[("temperature", json!("hot"))]);
        assert!(resolve(&m, &mock_forcefields()).is_err());
        let m = raw(&[("gpu_enabled", json!("yes"))]);
        assert!(resolve(&m, &mock_forcefields()).is_err());
        let m = raw(&[("ntmpi", json!(-2))]);
        assert!(resolve(&m, &mock_forcefields()).is_err());
    }
}

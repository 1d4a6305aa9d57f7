//! Extracción de progreso desde la salida del engine.
//!
//! Reconoce el contador de pasos (`Step <n>`) en una línea y lo convierte en
//! porcentaje contra un total asumido. Nunca falla: una línea sin marcador
//! devuelve `None` y el caller la deja pasar sin actualizar progreso.
//!
//! Limitación conocida y preservada: el denominador es una constante fija,
//! no el número de pasos configurado de la fase, así que el porcentaje es
//! sólo aproximado cuando la fase usa otro total.

use once_cell::sync::Lazy;
use regex::Regex;

/// Total de pasos asumido para el cálculo de porcentaje.
pub const ASSUMED_TOTAL_STEPS: u64 = 50_000;

static STEP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Step\s+(\d+)").expect("step regex"));

/// Extrae la fracción completada (0..100) de una línea de salida, si la
/// línea contiene un contador de pasos.
pub fn extract(line: &str, assumed_total_steps: u64) -> Option<f64> {
    let caps = STEP_RE.captures(line)?;
    let current: u64 = caps.get(1)?.as_str().parse().ok()?;
    let pct = current as f64 / assumed_total_steps as f64 * 100.0;
    Some(pct.min(100.0))
}

//! Configuración central de la aplicación.
//! Carga variables de entorno (.env) y expone una estructura inmutable
//! (`CONFIG`). Define dónde vive el binario del engine, dónde buscar campos
//! de fuerzas y si el modo mock está forzado por configuración.

use std::path::PathBuf;

use once_cell::sync::Lazy;
use std::env;

/// Configuración global de la aplicación.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Configuración del engine externo.
    pub engine: EngineConfig,
}

/// Parámetros del binario del engine (GROMACS).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directorio donde vive el binario `gmx`.
    pub bin_path: PathBuf,
    /// Directorio de campos de fuerzas instalados.
    pub force_fields_path: PathBuf,
    /// Forzar modo mock sin sondear el binario real.
    pub mock_mode: bool,
}

impl EngineConfig {
    /// Ruta completa al ejecutable `gmx`.
    pub fn gmx_command(&self) -> PathBuf {
        self.bin_path.join("gmx")
    }
}

impl AppConfig {
    /// Construye la configuración desde el entorno, con defaults seguros.
    /// No falla: toda variable ausente recibe su valor por defecto.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let bin_path = env::var("GMX_BIN_PATH").unwrap_or_else(|_| "/usr/local/gromacs/bin".into());
        let ff_path = env::var("GMX_FORCE_FIELDS_PATH")
            .unwrap_or_else(|_| "/usr/local/gromacs/share/gromacs/top".into());
        let mock = env::var("MOCK_GMX").map(|v| v.eq_ignore_ascii_case("true"))
                                       .unwrap_or(false);
        AppConfig { engine: EngineConfig { bin_path: PathBuf::from(bin_path),
                                           force_fields_path: PathBuf::from(ff_path),
                                           mock_mode: mock } }
    }
}

/// Instancia global perezosa de configuración, evaluada una sola vez.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        // No tocamos el entorno global: construimos con claves inexistentes.
        let cfg = AppConfig::from_env();
        assert!(cfg.engine.gmx_command().ends_with("gmx"));
    }

    #[test]
    fn test_gmx_command_join() {
        let engine = EngineConfig { bin_path: PathBuf::from("/opt/gromacs/bin"),
                                    force_fields_path: PathBuf::from("/opt/gromacs/top"),
                                    mock_mode: true };
        assert_eq!(engine.gmx_command(), PathBuf::from("/opt/gromacs/bin/gmx"));
    }
}

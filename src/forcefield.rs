//! Descubrimiento de campos de fuerzas instalados.
//!
//! En modo real se recorre el directorio de instalación buscando
//! subdirectorios que contengan `forcefield.itp`, leyendo de allí una línea
//! de descripción opcional. En modo mock se devuelve una lista fija y
//! determinista.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Campo de fuerzas disponible para `pdb2gmx`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForceField {
    pub name: String,
    pub description: String,
}

/// Lista fija usada en modo mock (idéntica a la del servicio original).
pub fn mock_forcefields() -> Vec<ForceField> {
    [("amber99sb-ildn", "AMBER99SB-ILDN protein force field"),
     ("charmm36-jul2022", "CHARMM36 all-atom force field"),
     ("gromos54a7", "GROMOS 54A7 united-atom force field"),
     ("oplsaa", "OPLS-AA all-atom force field"),
     ("amber14sb", "AMBER14SB protein force field")].iter()
                                                    .map(|(n, d)| ForceField { name: n.to_string(),
                                                                               description: d.to_string() })
                                                    .collect()
}

/// Recorre el directorio de campos de fuerzas instalados. Un campo válido es
/// un subdirectorio con un archivo `forcefield.itp`. Directorios ilegibles se
/// omiten en silencio (el descubrimiento nunca es fatal).
pub fn discover_forcefields(ff_path: &Path) -> Vec<ForceField> {
    let mut forcefields = Vec::new();
    let entries = match fs::read_dir(ff_path) {
        Ok(entries) => entries,
        Err(_) => return forcefields,
    };

    for entry in entries.flatten() {
        let dir = entry.path();
        let itp = dir.join("forcefield.itp");
        if dir.is_dir() && itp.is_file() {
            let name = entry.file_name().to_string_lossy().to_string();
            let description = read_description(&itp).unwrap_or_else(|| format!("{} force field", name));
            forcefields.push(ForceField { name, description });
        }
    }
    forcefields
}

/// Busca una línea de comentario `; ... description ...` dentro del .itp.
fn read_description(itp: &Path) -> Option<String> {
    let file = fs::File::open(itp).ok()?;
    for line in BufReader::new(file).lines() {
        let line = line.ok()?;
        let trimmed = line.trim();
        if trimmed.starts_with(';') && trimmed.to_lowercase().contains("description") {
            return Some(trimmed[1..].trim().to_string());
        }
    }
    None
}

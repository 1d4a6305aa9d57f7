//! Fases de simulación y sub-pasos de preparación.
//!
//! El orden de las fases es fijo y total: minimización → NVT → NPT →
//! producción. Cada fase lleva asociado su archivo de control, su prefijo de
//! salida y el rol del artifact estructural que consume/produce. La
//! preparación tiene su propio orden fijo: topología → solvatación → iones.

use serde::{Deserialize, Serialize};

/// Fase ejecutable del pipeline de simulación.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Minimization,
    Nvt,
    Npt,
    Production,
}

impl Phase {
    /// Todas las fases en orden de ejecución.
    pub const ALL: [Phase; 4] = [Phase::Minimization, Phase::Nvt, Phase::Npt, Phase::Production];

    /// Nombre estable en minúsculas (clave de templates y archivos).
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Minimization => "minimization",
            Phase::Nvt => "nvt",
            Phase::Npt => "npt",
            Phase::Production => "production",
        }
    }

    /// Archivo de control generado para la fase (`<fase>.ctrl`).
    pub fn control_file(&self) -> String {
        format!("{}.ctrl", self.name())
    }

    /// Prefijo de los archivos de salida del engine para la fase.
    pub fn output_prefix(&self) -> &'static str {
        match self {
            Phase::Minimization => "em",
            Phase::Nvt => "nvt",
            Phase::Npt => "npt",
            Phase::Production => "md",
        }
    }

    /// Fase previa en la cadena (None para la primera).
    pub fn previous(&self) -> Option<Phase> {
        match self {
            Phase::Minimization => None,
            Phase::Nvt => Some(Phase::Minimization),
            Phase::Npt => Some(Phase::Nvt),
            Phase::Production => Some(Phase::Npt),
        }
    }

    /// Fase siguiente en la cadena (None para la última).
    pub fn next(&self) -> Option<Phase> {
        match self {
            Phase::Minimization => Some(Phase::Nvt),
            Phase::Nvt => Some(Phase::Npt),
            Phase::Npt => Some(Phase::Production),
            Phase::Production => None,
        }
    }

    /// Estructura de entrada: salida estructural de la fase anterior.
    /// La primera fase resuelve su entrada con la cadena de preparación
    /// (iones > solvatada > cruda), por eso devuelve None aquí.
    pub fn input_structure(&self) -> Option<String> {
        self.previous().map(|p| format!("{}.gro", p.output_prefix()))
    }

    /// Estructura de salida producida por la fase.
    pub fn output_structure(&self) -> String {
        format!("{}.gro", self.output_prefix())
    }

    /// Descriptor compilado listo para ejecutar (salida del preprocessing).
    pub fn run_descriptor(&self) -> String {
        format!("{}.tpr", self.output_prefix())
    }

    pub fn parse(name: &str) -> Option<Phase> {
        match name {
            "minimization" => Some(Phase::Minimization),
            "nvt" => Some(Phase::Nvt),
            "npt" => Some(Phase::Npt),
            "production" => Some(Phase::Production),
            _ => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Sub-paso de la etapa de preparación (orden fijo).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrepStep {
    Topology,
    Solvation,
    IonAddition,
}

impl PrepStep {
    /// Orden fijo de ejecución de la preparación.
    pub const ORDER: [PrepStep; 3] = [PrepStep::Topology, PrepStep::Solvation, PrepStep::IonAddition];

    pub fn name(&self) -> &'static str {
        match self {
            PrepStep::Topology => "topology",
            PrepStep::Solvation => "solvation",
            PrepStep::IonAddition => "ion_addition",
        }
    }
}

impl std::fmt::Display for PrepStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order_is_total() {
        assert_eq!(Phase::ALL.len(), 4);
        assert_eq!(Phase::Minimization.next(), Some(Phase::Nvt));
        assert_eq!(Phase::Nvt.next(), Some(Phase::Npt));
        assert_eq!(Phase::Npt.next(), Some(Phase::Production));
        assert_eq!(Phase::Production.next(), None);
        assert_eq!(Phase::Minimization.previous(), None);
    }

    #[test]
    fn test_phase_file_bindings() {
        assert_eq!(Phase::Minimization.control_file(), "minimization.ctrl");
        assert_eq!(Phase::Minimization.output_prefix(), "em");
        assert_eq!(Phase::Production.run_descriptor(), "md.tpr");
        assert_eq!(Phase::Nvt.input_structure().as_deref(), Some("em.gro"));
        assert_eq!(Phase::Production.input_structure().as_deref(), Some("npt.gro"));
        assert_eq!(Phase::Minimization.input_structure(), None);
    }

    #[test]
    fn test_phase_parse_roundtrip() {
        for phase in Phase::ALL {
            assert_eq!(Phase::parse(phase.name()), Some(phase));
        }
        assert_eq!(Phase::parse("equilibration"), None);
    }

    #[test]
    fn test_prep_order_fixed() {
        assert_eq!(PrepStep::ORDER,
                   [PrepStep::Topology, PrepStep::Solvation, PrepStep::IonAddition]);
    }
}

//! Capa de ejecución de procesos.
//!
//! - [`command`]: construcción de comandos del engine, ejecución buffered y
//!   sondeo de versión.
//! - [`stream`]: secuencia perezosa de líneas con falla de salida diferida y
//!   cancelación que termina al hijo.
//! - [`engine`]: trait `EngineProvider` (costura real/mock) y selección
//!   estática de backend.
//! - [`mock`]: sustituto determinista cuando el binario real no está.

pub mod command;
pub mod engine;
pub mod mock;
pub mod stream;

pub use command::EngineCommand;
pub use engine::{select_engine, EngineProvider, GmxEngineProvider};
pub use mock::MockEngineProvider;
pub use stream::EngineStream;

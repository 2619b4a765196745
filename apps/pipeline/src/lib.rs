// [apps/pipeline/src/lib.rs]
/*!
 * =================================================================
 * APARATO: ORQUESTADOR DEL PIPELINE SRI (V4.0 - GOLD MASTER)
 * CLASIFICACIÓN: APPLICATION LAYER (ESTRATO L1-APP)
 * RESPONSABILIDAD: SECUENCIACIÓN DE ETAPAS Y SUPERFICIE DE CONTROL
 * =================================================================
 */

pub mod bootstrap;
pub mod errors;
pub mod procesador;

pub use bootstrap::ContextoAplicacion;
pub use errors::PipelineError;
pub use procesador::{OpcionesProcesamiento, ProcesadorComprobante};

// [libs/infra/db/src/repositories/mod.rs]
/*!
 * =================================================================
 * APARATO: REGISTRO DE REPOSITORIOS TRIBUTARIOS (V4.0 - SOBERANO)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: EXPOSICIÓN NOMINAL DE LOS AGREGADOS PERSISTENTES
 * =================================================================
 */

pub mod comprobante;
pub mod emisor;
pub mod secuencial;

pub use comprobante::ComprobanteRepository;
pub use emisor::EmisorRepository;
pub use secuencial::SecuencialRepository;

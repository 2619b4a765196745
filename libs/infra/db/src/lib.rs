// [libs/infra/db/src/lib.rs]
/*!
 * =================================================================
 * APARATO: ADAPTADOR DE PERSISTENCIA TRIBUTARIA (V4.0 - SOBERANO)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: FACHADA PÚBLICA DEL LEDGER TRIBUTARIO
 * =================================================================
 */

pub mod client;
pub mod errors;
pub mod repositories;
pub mod schema;

pub use client::LedgerClient;
pub use errors::DbError;
pub use repositories::{
    ComprobanteRepository, EmisorRepository, SecuencialRepository,
};

// [libs/infra/firma/src/lib.rs]
/*!
 * =================================================================
 * APARATO: FIRMA DIGITAL XADES-BES (V4.0 - SOBERANO)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: FACHADA PÚBLICA DEL ESTRATO DE FIRMA
 * =================================================================
 */

pub mod certificado;
pub mod errors;
pub mod xades;

pub use certificado::{Certificado, InfoCertificado};
pub use errors::FirmaError;
pub use xades::{canonicalizar, firmar_comprobante, verificar_firma};

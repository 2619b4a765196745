// [libs/domain/ride/src/lib.rs]
/*!
 * =================================================================
 * APARATO: GENERADOR RIDE (V3.0 - SOBERANO)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: REPRESENTACIÓN IMPRESA DEL DOCUMENTO ELECTRÓNICO
 *
 * El RIDE es observacional: su fallo jamás degrada el estado del
 * comprobante autorizado. El layout es fijo; el estilo no forma parte
 * del contrato.
 * =================================================================
 */

pub mod codigos;
pub mod documento;

use thiserror::Error;

pub use documento::generar_ride;

#[derive(Error, Debug)]
pub enum RideError {
    /// Colapso del motor PDF durante el ensamblado.
    #[error("[L2_RIDE_FAULT]: MOTOR_PDF -> {0}")]
    Pdf(String),

    /// La clave no pudo proyectarse a la simbología Code128.
    #[error("[L2_RIDE_FAULT]: CODIGO_BARRAS -> {0}")]
    CodigoBarras(String),

    /// La clave no pudo proyectarse a módulos QR.
    #[error("[L2_RIDE_FAULT]: CODIGO_QR -> {0}")]
    CodigoQr(String),
}

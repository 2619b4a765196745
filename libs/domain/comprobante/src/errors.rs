// [libs/domain/comprobante/src/errors.rs]
/*!
 * =================================================================
 * APARATO: CATÁLOGO DE ERRORES DEL CONSTRUCTOR (V2.0 - SOBERANO)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: FALLOS DE FRONTERA DEL CONSTRUCTOR XML
 *
 * Un fallo en este estrato significa que el comprobante JAMÁS se crea:
 * la venta se rechaza en la frontera antes de consumir un secuencial XML.
 * =================================================================
 */

use factel_core_sri::SriCoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuilderError {
    /// Identificación del emisor o comprador rechazada por el núcleo L1.
    #[error("[L2_BUILDER_FAULT]: IDENTIFICACION_RECHAZADA -> {0}")]
    Identificacion(#[from] SriCoreError),

    /// La vista de venta viola el contrato (sin líneas, cifras negativas).
    #[error("[L2_BUILDER_FAULT]: VENTA_INVALIDA -> {0}")]
    VentaInvalida(String),

    /// El total declarado y el total reconstruido difieren en más de 0.01.
    #[error("[L2_BUILDER_FAULT]: DESCUADRE_MONETARIO -> declarado {declarado}, reconstruido {reconstruido}")]
    DescuadreMonetario { declarado: String, reconstruido: String },

    /// Fallo del motor de serialización XML.
    #[error("[L2_BUILDER_FAULT]: XML_SERIALIZATION_COLLAPSE -> {0}")]
    Xml(String),
}

// [libs/domain/models/src/lib.rs]
/*!
 * =================================================================
 * APARATO: TRIBUTARY DOMAIN MODELS (V3.0 - PRODUCTION MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: DEFINICIÓN DE CONTRATOS SOBERANOS DEL COMPROBANTE
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. STATE SOVEREIGNTY: La máquina de estados del comprobante vive en
 *    el dominio; la infraestructura solo persiste transiciones legales.
 * 2. AUDIT IMMUTABILITY: Un comprobante terminal jamás muta, salvo por
 *    la adición de mensajes observacionales.
 * 3. NOMINAL PRECISION: Nomenclatura nominal absoluta en todos los campos.
 * =================================================================
 */

pub mod comprobante;
pub mod emisor;
pub mod mensajes;
pub mod venta;

pub use comprobante::{
    Ambiente, Comprobante, EstadoComprobante, ModelError, TipoComprobante, TipoEmision,
};
pub use emisor::{ConfiguracionEmisor, TipoContribuyente};
pub use mensajes::{MensajeSri, SeveridadMensaje};
pub use venta::{LineaVenta, TipoIdentificacion, VentaView};

// [libs/domain/comprobante/src/lib.rs]
/*!
 * =================================================================
 * APARATO: CONSTRUCTOR DE COMPROBANTES (V4.0 - GOLD MASTER)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: CONSTRUCCIÓN DEL ÁRBOL XML TRIBUTARIO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CANONICAL READY: El árbol se serializa en forma estable (atributos
 *    en orden de construcción, elementos vacíos expandidos) para que el
 *    estrato de firma lo digiera sin re-canonicalización profunda.
 * 2. MONETARY SOVEREIGNTY: Toda cifra monetaria se proyecta a dos
 *    decimales con redondeo mitad-lejos-de-cero antes de emitirse.
 * =================================================================
 */

pub mod errors;
pub mod factura;
pub mod montos;

pub use errors::BuilderError;
pub use factura::{construir_factura, validar_venta, FacturaConstruida};
pub use montos::{codigo_porcentaje_iva, monto2, ResumenMontos};

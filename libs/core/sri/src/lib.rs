// [libs/core/sri/src/lib.rs]
/*!
 * =================================================================
 * APARATO: NÚCLEO TRIBUTARIO SRI (V4.0 - GOLD MASTER)
 * CLASIFICACIÓN: CORE LOGIC (ESTRATO L1)
 * RESPONSABILIDAD: ARITMÉTICA DE CLAVES DE ACCESO E IDENTIFICACIONES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. PURE COMPUTATION: Cero I/O. Todo el estrato es determinista dado
 *    el código numérico de entropía como parámetro explícito.
 * 2. IDEMPOTENT REGENERATION: El código numérico se inyecta desde el
 *    comprobante persistido, garantizando claves reproducibles.
 * =================================================================
 */

pub mod clave_acceso;
pub mod errors;
pub mod identificacion;

pub use clave_acceso::{
    calcular_digito_verificador, codigo_numerico_desde_reloj, formatear_numero,
    generar_clave_acceso, parsear_numero, ParametrosClave,
};
pub use errors::SriCoreError;
pub use identificacion::{validar_cedula, validar_ruc};

// [libs/core/sri/src/errors.rs]
/*!
 * =================================================================
 * APARATO: CATÁLOGO DE ERRORES TRIBUTARIOS (V1.1 - SOBERANO)
 * CLASIFICACIÓN: CORE LOGIC (ESTRATO L1)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE ENTRADA
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SriCoreError {
    /// El RUC no cumple el formato de 13 dígitos numéricos.
    #[error("[L1_RUC_FAULT]: RUC_INVALIDO -> {0}")]
    RucInvalido(String),

    /// La cédula falla el algoritmo módulo 10 o su estructura provincial.
    #[error("[L1_CEDULA_FAULT]: CEDULA_INVALIDA -> {0}")]
    CedulaInvalida(String),

    /// Un componente de la clave no respeta su longitud o alfabeto decimal.
    #[error("[L1_CLAVE_FAULT]: COMPONENTE_MALFORMADO -> {campo}: {valor}")]
    ComponenteMalformado { campo: &'static str, valor: String },

    /// El número formateado no respeta la gramática EEE-PPP-SSSSSSSSS.
    #[error("[L1_NUMERO_FAULT]: NUMERO_MALFORMADO -> {0}")]
    NumeroMalformado(String),
}

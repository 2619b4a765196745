// [libs/infra/db/src/errors.rs]
/*!
 * =================================================================
 * APARATO: CATÁLOGO DE ERRORES DE PERSISTENCIA (V3.1 - SOBERANO)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DEL LEDGER
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Error de enlace físico o de red con el motor libSQL.
    #[error("[L3_DB_NET_FAULT]: DATABASE_UPLINK_SEVERED -> {0}")]
    ConnectionError(String),

    /// Fallo en la configuración del entorno (variables vacías o malformadas).
    #[error("[L3_DB_CONFIG_FAULT]: STRATEGIC_ENV_VOID -> {0}")]
    ConfigurationError(String),

    /// Error de sintaxis o ejecución devuelto por el motor libSQL.
    #[error("[L3_DB_QUERY_FAULT]: SQL_QUERY_REJECTED -> {0}")]
    QueryError(#[from] libsql::Error),

    /// Fallo en la transformación de tipos entre SQLite y el dominio Rust.
    #[error("[L3_DB_MAPPING_FAULT]: DATA_MAPPING_VIOLATION -> {0}")]
    MappingError(String),

    /// Error al comprometer cambios en una secuencia multi-tabla.
    #[error("[L3_DB_FAULT]: TRANSACTION_COLLAPSE")]
    TransactionError,

    // --- ESTRATO DE CONTROL SECUENCIAL (C1) ---

    /// El contador alcanzó el techo legal de 999.999.999.
    #[error("[L3_SECUENCIA_FAULT]: SECUENCIA_AGOTADA -> emisor {emisor}, tipo {tipo}")]
    SecuenciaAgotada { emisor: String, tipo: String },

    /// Valor de reinicio administrativo fuera del rango legal.
    #[error("[L3_SECUENCIA_FAULT]: VALOR_DE_REINICIO_ILEGAL -> {0}")]
    ReinicioIlegal(u32),

    // --- ESTRATO DE COMPROBANTES ---

    /// El comprobante solicitado no existe en el Ledger.
    #[error("[L3_COMPROBANTE_FAULT]: IDENTIFIER_NOT_FOUND")]
    ComprobanteNoEncontrado,

    /// El número formateado persistido no es derivable de su tripleta.
    #[error("[L3_COMPROBANTE_FAULT]: NUMERO_INCOHERENTE -> {0}")]
    NumeroIncoherente(String),

    /// Intento de sobrescribir un comprobante sellado en estado terminal.
    #[error("[L3_COMPROBANTE_FAULT]: ESTADO_TERMINAL_INMUTABLE -> {0}")]
    EstadoTerminalInmutable(String),

    // --- ESTRATO DE CONFIGURACIÓN DEL EMISOR ---

    /// La fila única de configuración del emisor aún no fue sembrada.
    #[error("[L3_EMISOR_FAULT]: CONFIGURACION_AUSENTE")]
    ConfiguracionAusente,
}

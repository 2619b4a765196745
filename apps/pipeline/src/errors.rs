// [apps/pipeline/src/errors.rs]
/*!
 * =================================================================
 * APARATO: TAXONOMÍA DE ERRORES DEL ORQUESTADOR (V2.2 - SOBERANO)
 * CLASIFICACIÓN: APPLICATION LAYER (ESTRATO L1-APP)
 * RESPONSABILIDAD: PROYECCIÓN DE FALLOS DE ETAPA A TRANSICIONES
 *
 * POLÍTICA DE PROPAGACIÓN:
 * - Los fallos REINTENTABLES (red, sondeo agotado, plazo) jamás
 *   avanzan el estado: el comprobante queda en su último estado estable.
 * - Los fallos TERMINALES avanzan siempre a un estado terminal.
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Db(#[from] factel_infra_db::DbError),

    #[error(transparent)]
    Modelo(#[from] factel_domain_models::ModelError),

    #[error(transparent)]
    Constructor(#[from] factel_domain_comprobante::BuilderError),

    #[error(transparent)]
    Firma(#[from] factel_infra_firma::FirmaError),

    #[error(transparent)]
    Sri(#[from] factel_infra_sri_ws::SriWsError),

    /// Validación XSD fallida en ambiente de producción.
    #[error("[L1_PIPELINE_FAULT]: VALIDACION_FALLIDA -> {0} errores de esquema")]
    ValidacionFallida(usize),

    /// Intento de procesar desde un estado terminal no autorizado.
    #[error("[L1_PIPELINE_FAULT]: ESTADO_INVALIDO -> {0}")]
    EstadoInvalido(String),

    /// El comprobante no tiene snapshot de venta para reconstruir el XML.
    #[error("[L1_PIPELINE_FAULT]: VENTA_AUSENTE -> comprobante {0}")]
    VentaAusente(String),

    /// Plazo global del documento excedido; queda en su último estado persistido.
    #[error("[L1_PIPELINE_FAULT]: PLAZO_EXCEDIDO -> comprobante {0}")]
    PlazoExcedido(String),
}

impl PipelineError {
    /// Un fallo reintentable deja el comprobante en su último estado
    /// estable y permite reanudar con `procesar`/`reprocesar`.
    pub fn es_reintentable(&self) -> bool {
        match self {
            Self::Sri(fallo) => fallo.es_reintentable(),
            Self::PlazoExcedido(_) => true,
            _ => false,
        }
    }
}

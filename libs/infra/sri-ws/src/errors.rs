// [libs/infra/sri-ws/src/errors.rs]
/*!
 * =================================================================
 * APARATO: CATÁLOGO DE ERRORES DEL UPLINK SRI (V2.1 - SOBERANO)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: TAXONOMÍA DE FALLOS DE RED Y DE NEGOCIO
 *
 * Los fallos de red (Conexion, Timeout) son REINTENTABLES: el
 * orquestador deja el comprobante en su último estado estable. El
 * sondeo agotado (AutorizacionPendiente) también lo es.
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SriWsError {
    /// Enlace físico rechazado o cortado tras agotar los reintentos.
    #[error("[L3_SRI_NET_FAULT]: CONEXION_SEVERED -> {0}")]
    ConexionSri(String),

    /// Tiempo de espera agotado tras los reintentos configurados.
    #[error("[L3_SRI_NET_FAULT]: TIMEOUT -> {0}")]
    TimeoutSri(String),

    /// Respuesta 4xx del servicio: detalle de fault sin reintento.
    #[error("[L3_SRI_FAULT]: RECHAZO_DEL_SERVICIO -> HTTP_{codigo}: {detalle}")]
    RechazoDelServicio { codigo: u16, detalle: String },

    /// El cuerpo SOAP no respeta la gramática esperada.
    #[error("[L3_SRI_FAULT]: RESPUESTA_ILEGIBLE -> {0}")]
    RespuestaIlegible(String),

    /// El sondeo de autorización agotó su techo con veredicto EN PROCESO.
    /// El comprobante permanece en Recibido para un sondeo posterior.
    #[error("[L3_SRI_FAULT]: AUTORIZACION_PENDIENTE -> clave {0}")]
    AutorizacionPendiente(String),
}

impl SriWsError {
    /// Un fallo reintentable jamás avanza el estado del comprobante.
    pub fn es_reintentable(&self) -> bool {
        matches!(
            self,
            Self::ConexionSri(_) | Self::TimeoutSri(_) | Self::AutorizacionPendiente(_)
        )
    }
}

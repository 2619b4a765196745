// [libs/infra/sri-ws/src/lib.rs]
/*!
 * =================================================================
 * APARATO: UPLINK SOAP HACIA EL SRI (V4.0 - SOBERANO)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: FACHADA PÚBLICA DEL TRANSPORTE TRIBUTARIO
 * =================================================================
 */

pub mod client;
pub mod envelope;
pub mod errors;

pub use client::{PoliticaReintentos, PoliticaSondeo, SriWsClient};
pub use envelope::{
    parsear_respuesta_autorizacion, parsear_respuesta_recepcion, sobre_autorizacion,
    sobre_autorizacion_lote, sobre_recepcion, EstadoAutorizacion, EstadoRecepcion,
    RespuestaAutorizacion, RespuestaRecepcion,
};
pub use errors::SriWsError;

/// Puerto de transporte hacia el SRI. El orquestador es genérico sobre
/// este contrato; los escenarios de prueba lo satisfacen con respuestas
/// guionadas sin tocar la red.
pub trait TransporteSri {
    /// `validarComprobante(xml)`: recepción del comprobante firmado.
    fn validar_comprobante(
        &self,
        xml_firmado: &str,
    ) -> impl std::future::Future<Output = Result<RespuestaRecepcion, SriWsError>> + Send;

    /// `autorizacionComprobante(claveAcceso)`: consulta puntual de autorización.
    fn autorizacion_comprobante(
        &self,
        clave_acceso: &str,
    ) -> impl std::future::Future<Output = Result<RespuestaAutorizacion, SriWsError>> + Send;

    /// Sondeo acotado hasta veredicto terminal o techo de intentos.
    fn sondear_autorizacion(
        &self,
        clave_acceso: &str,
    ) -> impl std::future::Future<Output = Result<RespuestaAutorizacion, SriWsError>> + Send;
}

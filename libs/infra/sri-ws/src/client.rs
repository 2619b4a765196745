// [libs/infra/sri-ws/src/client.rs]
/*!
 * =================================================================
 * APARATO: CLIENTE SOAP DEL SRI (V4.3 - RESILIENT UPLINK)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: RECEPCIÓN, AUTORIZACIÓN Y SONDEO CON REINTENTOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. BACKOFF LINEAL-EXPONENCIAL: pausa = base · intento ante fallos de
 *    transporte y HTTP 5xx; los 4xx exponen su fault sin reintento.
 * 2. BOUNDED POLL: El sondeo de autorización respeta un techo de
 *    intentos y de tiempo total; agotado el techo el comprobante
 *    permanece en Recibido para un sondeo posterior.
 * 3. STATELESS SHARE: El cliente es compartible entre corridas (Arc)
 *    una vez construido.
 * =================================================================
 */

use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use crate::envelope::{
    parsear_respuesta_autorizacion, parsear_respuesta_recepcion, sobre_autorizacion,
    sobre_autorizacion_lote, sobre_recepcion, EstadoAutorizacion, RespuestaAutorizacion,
    RespuestaRecepcion,
};
use crate::errors::SriWsError;
use crate::TransporteSri;

// Endpoints oficiales fijados por ambiente.
const RECEPCION_PRUEBAS: &str =
    "https://celcer.sri.gob.ec/comprobanteselectronicosws/services/RecepcionComprobantes";
const AUTORIZACION_PRUEBAS: &str =
    "https://celcer.sri.gob.ec/comprobanteselectronicosws/services/AutorizacionComprobantes";
const RECEPCION_PRODUCCION: &str =
    "https://cel.sri.gob.ec/comprobanteselectronicosws/services/RecepcionComprobantes";
const AUTORIZACION_PRODUCCION: &str =
    "https://cel.sri.gob.ec/comprobanteselectronicosws/services/AutorizacionComprobantes";

/// Política de reintentos por llamada SOAP.
#[derive(Debug, Clone)]
pub struct PoliticaReintentos {
    /// Tiempo máximo por intento.
    pub timeout: Duration,
    /// Intentos totales ante fallos de transporte o 5xx.
    pub intentos_maximos: u32,
    /// Base del backoff: pausa = base · intento.
    pub base_backoff: Duration,
}

impl Default for PoliticaReintentos {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            intentos_maximos: 3,
            base_backoff: Duration::from_secs(2),
        }
    }
}

/// Política del sondeo de autorización posterior a una recepción exitosa.
#[derive(Debug, Clone)]
pub struct PoliticaSondeo {
    /// Consultas máximas antes de declarar la autorización pendiente.
    pub intentos_maximos: u32,
    /// Intervalo inicial; crece linealmente con el intento.
    pub intervalo_inicial: Duration,
    /// Techo de tiempo total del sondeo.
    pub techo_total: Duration,
}

impl Default for PoliticaSondeo {
    fn default() -> Self {
        Self {
            intentos_maximos: 6,
            intervalo_inicial: Duration::from_secs(5),
            techo_total: Duration::from_secs(90),
        }
    }
}

/// Cliente SOAP del SRI, sin estado mutable tras su construcción.
pub struct SriWsClient {
    network_session_client: Client,
    recepcion_endpoint: String,
    autorizacion_endpoint: String,
    reintentos: PoliticaReintentos,
    sondeo: PoliticaSondeo,
}

impl SriWsClient {
    /**
     * Construye el cliente para el ambiente dado ("1" pruebas, "2" producción).
     */
    pub fn new(ambiente: &str, reintentos: PoliticaReintentos, sondeo: PoliticaSondeo) -> Self {
        let (recepcion, autorizacion) = if ambiente == "2" {
            (RECEPCION_PRODUCCION, AUTORIZACION_PRODUCCION)
        } else {
            (RECEPCION_PRUEBAS, AUTORIZACION_PRUEBAS)
        };

        info!(
            "🌐 [SRI_WS]: Uplink armed. Ambiente [{}], recepción [{}]",
            ambiente, recepcion
        );

        Self::con_endpoints(recepcion, autorizacion, reintentos, sondeo)
    }

    /// Constructor con endpoints explícitos (despliegues espejo del SRI).
    pub fn con_endpoints(
        recepcion: &str,
        autorizacion: &str,
        reintentos: PoliticaReintentos,
        sondeo: PoliticaSondeo,
    ) -> Self {
        let network_session_client = Client::builder()
            .timeout(reintentos.timeout)
            .user_agent("FACTEL-Uplink/4.3")
            .build()
            .unwrap_or_default();

        Self {
            network_session_client,
            recepcion_endpoint: recepcion.trim_end_matches('/').to_string(),
            autorizacion_endpoint: autorizacion.trim_end_matches('/').to_string(),
            reintentos,
            sondeo,
        }
    }

    /**
     * Ejecuta una llamada SOAP con la política de reintentos.
     *
     * # Logic:
     * - Transporte caído o HTTP 5xx ⇒ pausa base·intento y reintento.
     * - HTTP 4xx ⇒ fault expuesto sin reintento.
     *
     * # Errors:
     * - `TimeoutSri` / `ConexionSri` tras agotar los intentos.
     */
    async fn ejecutar_con_reintentos(
        &self,
        endpoint: &str,
        sobre: &str,
    ) -> Result<String, SriWsError> {
        let mut ultimo_fallo: Option<SriWsError> = None;

        for intento in 1..=self.reintentos.intentos_maximos {
            let envio = self
                .network_session_client
                .post(endpoint)
                .header("Content-Type", "text/xml; charset=utf-8")
                .header("SOAPAction", "")
                .body(sobre.to_string())
                .send()
                .await;

            match envio {
                Ok(respuesta) => {
                    let codigo = respuesta.status();

                    if codigo.is_success() {
                        return respuesta
                            .text()
                            .await
                            .map_err(|fallo| SriWsError::ConexionSri(fallo.to_string()));
                    }

                    let detalle = respuesta.text().await.unwrap_or_default();

                    if codigo.is_server_error() {
                        warn!(
                            "⚠️ [SRI_WS]: HTTP_{} on attempt {}/{}. Backing off.",
                            codigo.as_u16(),
                            intento,
                            self.reintentos.intentos_maximos
                        );
                        ultimo_fallo = Some(SriWsError::ConexionSri(format!(
                            "HTTP_{}: {}",
                            codigo.as_u16(),
                            detalle
                        )));
                    } else {
                        // 4xx: el fault se expone sin reintento.
                        return Err(SriWsError::RechazoDelServicio {
                            codigo: codigo.as_u16(),
                            detalle,
                        });
                    }
                }
                Err(fallo) if fallo.is_timeout() => {
                    warn!(
                        "⏱️ [SRI_WS]: Timeout on attempt {}/{}.",
                        intento, self.reintentos.intentos_maximos
                    );
                    ultimo_fallo = Some(SriWsError::TimeoutSri(fallo.to_string()));
                }
                Err(fallo) => {
                    warn!(
                        "🔌 [SRI_WS]: Transport fault on attempt {}/{}: {}",
                        intento, self.reintentos.intentos_maximos, fallo
                    );
                    ultimo_fallo = Some(SriWsError::ConexionSri(fallo.to_string()));
                }
            }

            if intento < self.reintentos.intentos_maximos {
                tokio::time::sleep(self.reintentos.base_backoff * intento).await;
            }
        }

        Err(ultimo_fallo
            .unwrap_or_else(|| SriWsError::ConexionSri("reintentos agotados".to_string())))
    }

    /// Consulta masiva de autorización por lote de claves.
    #[instrument(skip(self, claves))]
    pub async fn autorizacion_comprobante_lote(
        &self,
        claves: &[String],
    ) -> Result<Vec<RespuestaAutorizacion>, SriWsError> {
        debug!("📦 [SRI_WS]: Batch authorization probe for {} claves.", claves.len());

        let sobre = sobre_autorizacion_lote(claves);
        let cuerpo = self
            .ejecutar_con_reintentos(&self.autorizacion_endpoint, &sobre)
            .await?;

        // El lote comparte la gramática del sobre puntual; se parsea por
        // segmentos <autorizacion>.
        let mut respuestas = Vec::new();
        for segmento in cuerpo.split("<autorizacion>").skip(1) {
            let fragmento = format!("<autorizacion>{}", segmento);
            if let Ok(respuesta) = parsear_respuesta_autorizacion(&fragmento) {
                respuestas.push(respuesta);
            }
        }

        if respuestas.is_empty() {
            respuestas.push(parsear_respuesta_autorizacion(&cuerpo)?);
        }

        Ok(respuestas)
    }

    /// Sondeo simplificado de estado: (estado, detalle).
    pub async fn estado_comprobante(&self, clave_acceso: &str) -> (String, String) {
        match self.autorizacion_comprobante(clave_acceso).await {
            Ok(respuesta) => {
                let etiqueta = match respuesta.estado {
                    EstadoAutorizacion::Autorizado => "AUTORIZADO",
                    EstadoAutorizacion::NoAutorizado => "NO AUTORIZADO",
                    EstadoAutorizacion::EnProceso => "EN PROCESO",
                };
                (etiqueta.to_string(), respuesta.numero_autorizacion)
            }
            Err(fallo) => ("ERROR".to_string(), fallo.to_string()),
        }
    }
}

impl TransporteSri for SriWsClient {
    #[instrument(skip(self, xml_firmado))]
    async fn validar_comprobante(
        &self,
        xml_firmado: &str,
    ) -> Result<RespuestaRecepcion, SriWsError> {
        debug!("📤 [SRI_WS]: Dispatching comprobante ({} bytes).", xml_firmado.len());

        let sobre = sobre_recepcion(xml_firmado);
        let cuerpo = self
            .ejecutar_con_reintentos(&self.recepcion_endpoint, &sobre)
            .await?;

        parsear_respuesta_recepcion(&cuerpo)
    }

    #[instrument(skip(self))]
    async fn autorizacion_comprobante(
        &self,
        clave_acceso: &str,
    ) -> Result<RespuestaAutorizacion, SriWsError> {
        let sobre = sobre_autorizacion(clave_acceso);
        let cuerpo = self
            .ejecutar_con_reintentos(&self.autorizacion_endpoint, &sobre)
            .await?;

        parsear_respuesta_autorizacion(&cuerpo)
    }

    /**
     * Sondea la autorización hasta un veredicto terminal.
     *
     * # Logic:
     * El intervalo crece linealmente (inicial · intento) y el sondeo
     * respeta tanto el techo de intentos como el de tiempo total.
     *
     * # Errors:
     * - `AutorizacionPendiente` al agotar el techo con EN PROCESO.
     */
    #[instrument(skip(self))]
    async fn sondear_autorizacion(
        &self,
        clave_acceso: &str,
    ) -> Result<RespuestaAutorizacion, SriWsError> {
        let inicio = Instant::now();

        for intento in 1..=self.sondeo.intentos_maximos {
            let respuesta = self.autorizacion_comprobante(clave_acceso).await?;

            if respuesta.estado != EstadoAutorizacion::EnProceso {
                return Ok(respuesta);
            }

            debug!(
                "⏳ [SRI_WS]: EN PROCESO on poll {}/{} for clave [{}].",
                intento, self.sondeo.intentos_maximos, clave_acceso
            );

            if intento < self.sondeo.intentos_maximos {
                let pausa = self.sondeo.intervalo_inicial * intento;
                if inicio.elapsed() + pausa > self.sondeo.techo_total {
                    break;
                }
                tokio::time::sleep(pausa).await;
            }
        }

        Err(SriWsError::AutorizacionPendiente(clave_acceso.to_string()))
    }
}

// [libs/infra/sri-ws/src/envelope.rs]
/*!
 * =================================================================
 * APARATO: GRAMÁTICA DE SOBRES SOAP SRI (V4.1 - WIRE EXACT)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: CONSTRUCCIÓN Y PARSEO DE LOS SOBRES OFICIALES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. LOCAL-NAME SCAN: El parseo opera sobre nombres locales, inmune a
 *    los prefijos de namespace que el SRI rota entre despliegues.
 * 2. VERDICT CONTAINMENT: Los veredictos se clasifican por contención
 *    ("NO AUTORIZ" antes que "AUTORIZ") replicando el servicio real.
 * =================================================================
 */

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use factel_domain_models::{MensajeSri, SeveridadMensaje};

use crate::errors::SriWsError;

/// Veredicto del servicio de recepción.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstadoRecepcion {
    Recibida,
    Devuelta,
}

/// Veredicto del servicio de autorización.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstadoAutorizacion {
    Autorizado,
    NoAutorizado,
    EnProceso,
}

#[derive(Debug, Clone)]
pub struct RespuestaRecepcion {
    pub estado: EstadoRecepcion,
    pub mensajes: Vec<MensajeSri>,
}

#[derive(Debug, Clone)]
pub struct RespuestaAutorizacion {
    pub estado: EstadoAutorizacion,
    pub numero_autorizacion: String,
    pub fecha_autorizacion: String,
    pub xml_autorizado: String,
    pub mensajes: Vec<MensajeSri>,
}

// --- CONSTRUCCIÓN DE SOBRES ---

/// Sobre de `validarComprobante`: el XML firmado viaja en base64.
pub fn sobre_recepcion(xml_firmado: &str) -> String {
    format!(
        "<soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\" \
         xmlns:ec=\"http://ec.gob.sri.ws.recepcion\">\
         <soapenv:Header/><soapenv:Body>\
         <ec:validarComprobante><xml>{}</xml></ec:validarComprobante>\
         </soapenv:Body></soapenv:Envelope>",
        BASE64.encode(xml_firmado.as_bytes())
    )
}

/// Sobre de `autorizacionComprobante` para una clave puntual.
pub fn sobre_autorizacion(clave_acceso: &str) -> String {
    format!(
        "<soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\" \
         xmlns:ec=\"http://ec.gob.sri.ws.autorizacion\">\
         <soapenv:Header/><soapenv:Body>\
         <ec:autorizacionComprobante><claveAccesoComprobante>{}</claveAccesoComprobante>\
         </ec:autorizacionComprobante>\
         </soapenv:Body></soapenv:Envelope>",
        escape(clave_acceso)
    )
}

/// Sobre de `autorizacionComprobanteLote` para consulta masiva.
pub fn sobre_autorizacion_lote(claves: &[String]) -> String {
    let cuerpo: String = claves
        .iter()
        .map(|clave| format!("<claveAccesoComprobante>{}</claveAccesoComprobante>", escape(clave)))
        .collect();

    format!(
        "<soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\" \
         xmlns:ec=\"http://ec.gob.sri.ws.autorizacion\">\
         <soapenv:Header/><soapenv:Body>\
         <ec:autorizacionComprobanteLote>{}</ec:autorizacionComprobanteLote>\
         </soapenv:Body></soapenv:Envelope>",
        cuerpo
    )
}

// --- PARSEO DE RESPUESTAS ---

/**
 * Parsea la respuesta de recepción: campo `estado` más el rastro de
 * `mensaje` {identificador, mensaje, tipo, informacionAdicional}.
 *
 * # Errors:
 * - `RespuestaIlegible` si el sobre no trae veredicto de estado.
 */
pub fn parsear_respuesta_recepcion(cuerpo: &str) -> Result<RespuestaRecepcion, SriWsError> {
    let campos = escanear_campos(cuerpo)?;

    let estado_crudo = campos
        .primer_valor("estado")
        .ok_or_else(|| SriWsError::RespuestaIlegible("sobre sin campo estado".into()))?;

    let estado = if estado_crudo.to_uppercase().contains("DEVUELTA") {
        EstadoRecepcion::Devuelta
    } else {
        EstadoRecepcion::Recibida
    };

    Ok(RespuestaRecepcion {
        estado,
        mensajes: campos.mensajes,
    })
}

/**
 * Parsea la respuesta de autorización: veredicto, número, fecha, XML
 * autorizado (campo `comprobante`) y mensajes.
 */
pub fn parsear_respuesta_autorizacion(cuerpo: &str) -> Result<RespuestaAutorizacion, SriWsError> {
    let campos = escanear_campos(cuerpo)?;

    let estado_crudo = campos.primer_valor("estado").unwrap_or_default().to_uppercase();

    // El orden importa: "NO AUTORIZADO" también contiene "AUTORIZ".
    let estado = if estado_crudo.contains("NO AUTORIZ") {
        EstadoAutorizacion::NoAutorizado
    } else if estado_crudo.contains("AUTORIZ") {
        EstadoAutorizacion::Autorizado
    } else {
        EstadoAutorizacion::EnProceso
    };

    Ok(RespuestaAutorizacion {
        estado,
        numero_autorizacion: campos.primer_valor("numeroAutorizacion").unwrap_or_default(),
        fecha_autorizacion: campos.primer_valor("fechaAutorizacion").unwrap_or_default(),
        xml_autorizado: campos.primer_valor("comprobante").unwrap_or_default(),
        mensajes: campos.mensajes,
    })
}

/// Acumulador del escaneo por nombre local.
struct CamposSoap {
    valores: Vec<(String, String)>,
    mensajes: Vec<MensajeSri>,
}

impl CamposSoap {
    fn primer_valor(&self, nombre: &str) -> Option<String> {
        self.valores
            .iter()
            .find(|(etiqueta, _)| etiqueta == nombre)
            .map(|(_, valor)| valor.clone())
    }
}

fn escanear_campos(cuerpo: &str) -> Result<CamposSoap, SriWsError> {
    let mut reader = Reader::from_str(cuerpo);

    let mut valores: Vec<(String, String)> = Vec::new();
    let mut mensajes: Vec<MensajeSri> = Vec::new();

    let mut pila: Vec<String> = Vec::new();
    let mut texto_actual = String::new();

    // Acumulador del mensaje en construcción.
    let mut mensaje_identificador = String::new();
    let mut mensaje_texto = String::new();
    let mut mensaje_tipo = String::new();
    let mut mensaje_adicional = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(elemento)) => {
                let nombre = String::from_utf8_lossy(elemento.local_name().as_ref()).to_string();
                if nombre == "mensaje" && !pila.iter().any(|e| e == "mensaje") {
                    mensaje_identificador.clear();
                    mensaje_texto.clear();
                    mensaje_tipo.clear();
                    mensaje_adicional.clear();
                }
                pila.push(nombre);
                texto_actual.clear();
            }
            Ok(Event::Text(texto)) => {
                texto_actual = texto.unescape().unwrap_or_default().to_string();
            }
            Ok(Event::CData(seccion)) => {
                texto_actual = String::from_utf8_lossy(&seccion).to_string();
            }
            Ok(Event::End(_)) => {
                if let Some(nombre) = pila.pop() {
                    let dentro_de_mensaje = pila.iter().any(|e| e == "mensaje");

                    if dentro_de_mensaje {
                        match nombre.as_str() {
                            "identificador" => mensaje_identificador = texto_actual.clone(),
                            "mensaje" => mensaje_texto = texto_actual.clone(),
                            "tipo" => mensaje_tipo = texto_actual.clone(),
                            "informacionAdicional" => mensaje_adicional = texto_actual.clone(),
                            _ => {}
                        }
                    } else if nombre == "mensaje" {
                        // Cierre del bloque: cristalizamos el mensaje.
                        let severidad = if mensaje_tipo.to_uppercase().contains("ERROR") {
                            SeveridadMensaje::Error
                        } else {
                            SeveridadMensaje::Advertencia
                        };
                        let mut mensaje = MensajeSri {
                            severidad,
                            codigo: mensaje_identificador.clone(),
                            texto: mensaje_texto.clone(),
                            informacion_adicional: None,
                        };
                        if !mensaje_adicional.is_empty() {
                            mensaje.informacion_adicional = Some(mensaje_adicional.clone());
                        }
                        mensajes.push(mensaje);
                    } else {
                        valores.push((nombre, texto_actual.clone()));
                    }
                }
                texto_actual.clear();
            }
            Ok(Event::Eof) => break,
            Err(fallo) => return Err(SriWsError::RespuestaIlegible(fallo.to_string())),
            _ => {}
        }
    }

    Ok(CamposSoap { valores, mensajes })
}

// [tests/mirror/libs/infra/sri_ws/envelope_grammar.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE LA GRAMÁTICA SOAP SRI (V1.3 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE SOBRES Y PARSEO DE RESPUESTAS OFICIALES
 *
 * Los cuerpos de respuesta replican la forma de los sobres reales de
 * celcer.sri.gob.ec, incluyendo prefijos de namespace rotativos.
 * =================================================================
 */

use factel_domain_models::SeveridadMensaje;
use factel_infra_sri_ws::{
    parsear_respuesta_autorizacion, parsear_respuesta_recepcion, sobre_autorizacion,
    sobre_recepcion, EstadoAutorizacion, EstadoRecepcion,
};

const CLAVE: &str = "2202202601179123456700110010010000000011234567818";

#[test]
fn certificar_sobre_de_recepcion_en_base64() {
    let sobre = sobre_recepcion("<factura id=\"comprobante\"/>");

    assert!(sobre.contains("xmlns:ec=\"http://ec.gob.sri.ws.recepcion\""));
    assert!(sobre.contains("<ec:validarComprobante><xml>"));
    // El XML viaja en base64, jamás en claro.
    assert!(!sobre.contains("<factura id"));

    let carga = sobre
        .split("<xml>")
        .nth(1)
        .and_then(|resto| resto.split("</xml>").next())
        .unwrap();
    assert!(carga.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '='));
}

#[test]
fn certificar_sobre_de_autorizacion() {
    let sobre = sobre_autorizacion(CLAVE);
    assert!(sobre.contains("xmlns:ec=\"http://ec.gob.sri.ws.autorizacion\""));
    assert!(sobre.contains(&format!("<claveAccesoComprobante>{}</claveAccesoComprobante>", CLAVE)));
}

#[test]
fn certificar_parseo_recepcion_recibida() {
    let cuerpo = r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <ns2:validarComprobanteResponse xmlns:ns2="http://ec.gob.sri.ws.recepcion">
      <RespuestaRecepcionComprobante>
        <estado>RECIBIDA</estado>
        <comprobantes/>
      </RespuestaRecepcionComprobante>
    </ns2:validarComprobanteResponse>
  </soap:Body>
</soap:Envelope>"#;

    let respuesta = parsear_respuesta_recepcion(cuerpo).unwrap();
    assert_eq!(respuesta.estado, EstadoRecepcion::Recibida);
    assert!(respuesta.mensajes.is_empty());
}

#[test]
fn certificar_parseo_recepcion_devuelta_con_mensajes() {
    let cuerpo = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <ns2:validarComprobanteResponse xmlns:ns2="http://ec.gob.sri.ws.recepcion">
      <RespuestaRecepcionComprobante>
        <estado>DEVUELTA</estado>
        <comprobantes>
          <comprobante>
            <claveAcceso>2202202601179123456700110010010000000011234567818</claveAcceso>
            <mensajes>
              <mensaje>
                <identificador>45</identificador>
                <mensaje>ERROR SECUENCIAL REGISTRADO</mensaje>
                <informacionAdicional>El secuencial ya fue recibido</informacionAdicional>
                <tipo>ERROR</tipo>
              </mensaje>
            </mensajes>
          </comprobante>
        </comprobantes>
      </RespuestaRecepcionComprobante>
    </ns2:validarComprobanteResponse>
  </soap:Body>
</soap:Envelope>"#;

    let respuesta = parsear_respuesta_recepcion(cuerpo).unwrap();
    assert_eq!(respuesta.estado, EstadoRecepcion::Devuelta);
    assert_eq!(respuesta.mensajes.len(), 1);

    let mensaje = &respuesta.mensajes[0];
    assert_eq!(mensaje.codigo, "45");
    assert_eq!(mensaje.texto, "ERROR SECUENCIAL REGISTRADO");
    assert_eq!(mensaje.severidad, SeveridadMensaje::Error);
    assert_eq!(
        mensaje.informacion_adicional.as_deref(),
        Some("El secuencial ya fue recibido")
    );
}

#[test]
fn certificar_parseo_autorizado_con_comprobante() {
    let cuerpo = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <ns2:autorizacionComprobanteResponse xmlns:ns2="http://ec.gob.sri.ws.autorizacion">
      <RespuestaAutorizacionComprobante>
        <claveAccesoConsultada>2202202601179123456700110010010000000011234567818</claveAccesoConsultada>
        <autorizaciones>
          <autorizacion>
            <estado>AUTORIZADO</estado>
            <numeroAutorizacion>N-001</numeroAutorizacion>
            <fechaAutorizacion>01/03/2026 10:00:00</fechaAutorizacion>
            <ambiente>PRUEBAS</ambiente>
            <comprobante><![CDATA[<factura id="comprobante" version="1.1.0"><infoTributaria/></factura>]]></comprobante>
          </autorizacion>
        </autorizaciones>
      </RespuestaAutorizacionComprobante>
    </ns2:autorizacionComprobanteResponse>
  </soap:Body>
</soap:Envelope>"#;

    let respuesta = parsear_respuesta_autorizacion(cuerpo).unwrap();
    assert_eq!(respuesta.estado, EstadoAutorizacion::Autorizado);
    assert_eq!(respuesta.numero_autorizacion, "N-001");
    assert_eq!(respuesta.fecha_autorizacion, "01/03/2026 10:00:00");
    assert!(respuesta.xml_autorizado.contains("<factura id=\"comprobante\""));
}

#[test]
fn certificar_parseo_no_autorizado() {
    // "NO AUTORIZADO" contiene "AUTORIZ": el orden de contención importa.
    let cuerpo = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body>
      <autorizacion>
        <estado>NO AUTORIZADO</estado>
        <mensajes><mensaje><identificador>80</identificador><mensaje>FIRMA INVALIDA</mensaje><tipo>ERROR</tipo></mensaje></mensajes>
      </autorizacion>
    </soap:Body></soap:Envelope>"#;

    let respuesta = parsear_respuesta_autorizacion(cuerpo).unwrap();
    assert_eq!(respuesta.estado, EstadoAutorizacion::NoAutorizado);
    assert_eq!(respuesta.mensajes.len(), 1);
    assert_eq!(respuesta.mensajes[0].texto, "FIRMA INVALIDA");
}

#[test]
fn certificar_parseo_en_proceso() {
    let cuerpo = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body>
      <autorizacion><estado>EN PROCESO</estado></autorizacion>
    </soap:Body></soap:Envelope>"#;

    let respuesta = parsear_respuesta_autorizacion(cuerpo).unwrap();
    assert_eq!(respuesta.estado, EstadoAutorizacion::EnProceso);
    assert!(respuesta.numero_autorizacion.is_empty());
}

#[test]
fn certificar_respuesta_ilegible() {
    assert!(parsear_respuesta_recepcion("<sobre><roto>").is_err());
}

// [libs/infra/firma/src/xades.rs]
/*!
 * =================================================================
 * APARATO: MOTOR DE FIRMA ENVOLVENTE XADES-BES (V4.2 - DETERMINISTA)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: DIGEST, FIRMA RSA-SHA1 E INSERCIÓN DE <ds:Signature>
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. PERFIL BES MÍNIMO: SignedInfo + SignatureValue + KeyInfo; las
 *    extensiones QualifyingProperties son aditivas y quedan fuera del
 *    perfil emitido.
 * 2. DETERMINISMO: Misma entrada + misma credencial ⇒ mismos bytes.
 *
 * # Mathematical Proof (Canonicalización acotada):
 * Los comprobantes que firma este motor los genera el propio dominio:
 * árbol sin espacios de nombres, sin comentarios, sin CDATA y con
 * atributos en orden de construcción. Bajo ese dominio cerrado, la
 * re-serialización estable (elementos vacíos expandidos, texto
 * re-escapado) coincide con XML-C14N-20010315, y la transformación
 * XPath que excluye ds:Signature es la identidad porque la firma se
 * inserta DESPUÉS de calcular el digest.
 * =================================================================
 */

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use openssl::hash::MessageDigest;
use openssl::sign::Signer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use sha1::{Digest, Sha1};
use tracing::{debug, instrument};

use crate::certificado::Certificado;
use crate::errors::FirmaError;

const NS_XMLDSIG: &str = "http://www.w3.org/2000/09/xmldsig#";
const ALG_C14N: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";
const ALG_XPATH: &str = "http://www.w3.org/TR/1999/REC-xpath-19991116";
const ALG_RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";
const ALG_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";

/**
 * Re-serializa el documento en forma canónica estable: sin declaración
 * XML, elementos vacíos expandidos, texto re-escapado, atributos en el
 * orden original. Comentarios e instrucciones de proceso se descartan.
 *
 * # Errors:
 * - `XmlIlegible` ante XML mal formado.
 */
pub fn canonicalizar(xml: &str) -> Result<Vec<u8>, FirmaError> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());

    loop {
        match reader.read_event() {
            Ok(Event::Start(elemento)) => {
                escribir(&mut writer, Event::Start(elemento.to_owned()))?;
            }
            Ok(Event::Empty(elemento)) => {
                // Expansión canónica: <a/> ⇒ <a></a>.
                let nombre = String::from_utf8_lossy(elemento.name().as_ref()).to_string();
                escribir(&mut writer, Event::Start(elemento.to_owned()))?;
                escribir(&mut writer, Event::End(BytesEnd::new(nombre)))?;
            }
            Ok(Event::End(elemento)) => {
                escribir(&mut writer, Event::End(elemento.to_owned()))?;
            }
            Ok(Event::Text(texto)) => {
                let plano = texto
                    .unescape()
                    .map_err(|fallo| FirmaError::XmlIlegible(fallo.to_string()))?;
                escribir(&mut writer, Event::Text(BytesText::new(&plano).into_owned()))?;
            }
            Ok(Event::CData(seccion)) => {
                let plano = String::from_utf8_lossy(&seccion).to_string();
                escribir(&mut writer, Event::Text(BytesText::new(&plano).into_owned()))?;
            }
            Ok(Event::Decl(_)) | Ok(Event::Comment(_)) | Ok(Event::PI(_)) | Ok(Event::DocType(_)) => {}
            Ok(Event::Eof) => break,
            Err(fallo) => return Err(FirmaError::XmlIlegible(fallo.to_string())),
        }
    }

    Ok(writer.into_inner())
}

/**
 * Firma el comprobante con perfil XAdES-BES mínimo y devuelve el XML
 * UTF-8 con la firma insertada como último hijo de la raíz.
 *
 * # Logic:
 * 1. DigestValue = SHA-1 del documento canónico (aún sin firma).
 * 2. SignedInfo canónico ⇒ SignatureValue = RSA-SHA1(SignedInfo).
 * 3. KeyInfo porta el DER base64 de la hoja.
 * 4. Inserción in-place antes del cierre de la raíz.
 *
 * # Errors:
 * - `XmlIlegible` si el documento no parsea o carece de raíz.
 * - `MotorCriptografico` ante un colapso del firmador RSA.
 */
#[instrument(skip(xml, credencial))]
pub fn firmar_comprobante(xml: &str, credencial: &Certificado) -> Result<String, FirmaError> {
    // --- FASE 1: DIGEST DEL DOCUMENTO CANÓNICO ---
    let documento_canonico = canonicalizar(xml)?;
    let digest_documento = Sha1::digest(&documento_canonico);
    let digest_base64 = BASE64.encode(digest_documento);

    // --- FASE 2: SIGNED-INFO CANÓNICO Y FIRMA RSA-SHA1 ---
    let signed_info_interno = construir_signed_info(&digest_base64);

    // Forma canónica standalone: la declaración xmlns:ds se materializa.
    let signed_info_canonico = format!(
        "<ds:SignedInfo xmlns:ds=\"{}\">{}</ds:SignedInfo>",
        NS_XMLDSIG, signed_info_interno
    );

    let mut firmador = Signer::new(MessageDigest::sha1(), credencial.clave_privada())?;
    firmador.update(signed_info_canonico.as_bytes())?;
    let firma_bytes = firmador.sign_to_vec()?;
    let firma_base64 = BASE64.encode(&firma_bytes);

    // --- FASE 3: BLOQUE DE FIRMA COMPLETO ---
    let certificado_base64 = BASE64.encode(credencial.hoja_der()?);

    let bloque_firma = format!(
        "<ds:Signature xmlns:ds=\"{ns}\" Id=\"Signature\">\
         <ds:SignedInfo>{signed_info}</ds:SignedInfo>\
         <ds:SignatureValue>{firma}</ds:SignatureValue>\
         <ds:KeyInfo><ds:X509Data><ds:X509Certificate>{certificado}</ds:X509Certificate></ds:X509Data></ds:KeyInfo>\
         </ds:Signature>",
        ns = NS_XMLDSIG,
        signed_info = signed_info_interno,
        firma = firma_base64,
        certificado = certificado_base64,
    );

    // --- FASE 4: INSERCIÓN COMO ÚLTIMO HIJO DE LA RAÍZ ---
    let raiz = nombre_de_raiz(xml)?;
    let cierre_raiz = format!("</{}>", raiz);

    let posicion_cierre = xml
        .rfind(&cierre_raiz)
        .ok_or_else(|| FirmaError::XmlIlegible(format!("cierre de raíz ausente: {}", raiz)))?;

    let mut xml_firmado = String::with_capacity(xml.len() + bloque_firma.len());
    xml_firmado.push_str(&xml[..posicion_cierre]);
    xml_firmado.push_str(&bloque_firma);
    xml_firmado.push_str(&xml[posicion_cierre..]);

    debug!("✍️  [XADES]: Document signed. Digest: [{}]", digest_base64);
    Ok(xml_firmado)
}

/// Contenido interno de SignedInfo (idéntico embebido y canónico).
fn construir_signed_info(digest_base64: &str) -> String {
    format!(
        "<ds:CanonicalizationMethod Algorithm=\"{c14n}\"></ds:CanonicalizationMethod>\
         <ds:SignatureMethod Algorithm=\"{rsa_sha1}\"></ds:SignatureMethod>\
         <ds:Reference URI=\"\">\
         <ds:Transforms>\
         <ds:Transform Algorithm=\"{xpath}\"><ds:XPath>not(ancestor-or-self::ds:Signature)</ds:XPath></ds:Transform>\
         <ds:Transform Algorithm=\"{c14n}\"></ds:Transform>\
         </ds:Transforms>\
         <ds:DigestMethod Algorithm=\"{sha1}\"></ds:DigestMethod>\
         <ds:DigestValue>{digest}</ds:DigestValue>\
         </ds:Reference>",
        c14n = ALG_C14N,
        rsa_sha1 = ALG_RSA_SHA1,
        xpath = ALG_XPATH,
        sha1 = ALG_SHA1,
        digest = digest_base64,
    )
}

/**
 * Verificación estructural de una firma envolvente: presencia de
 * ds:Signature con un X509Certificate no vacío.
 */
pub fn verificar_firma(xml_firmado: &str) -> (bool, String) {
    let mut reader = Reader::from_str(xml_firmado);
    let mut firma_presente = false;
    let mut certificado_presente = false;
    let mut dentro_certificado = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(elemento)) => {
                let nombre = String::from_utf8_lossy(elemento.local_name().as_ref()).to_string();
                if nombre == "Signature" {
                    firma_presente = true;
                }
                dentro_certificado = nombre == "X509Certificate";
            }
            Ok(Event::Text(texto)) => {
                if dentro_certificado && !texto.unescape().unwrap_or_default().trim().is_empty() {
                    certificado_presente = true;
                }
            }
            Ok(Event::End(_)) => {
                dentro_certificado = false;
            }
            Ok(Event::Eof) => break,
            Err(fallo) => return (false, format!("XML ilegible: {}", fallo)),
            _ => {}
        }
    }

    match (firma_presente, certificado_presente) {
        (true, true) => (true, "Firma digital encontrada".to_string()),
        (true, false) => (false, "Firma sin certificado X.509".to_string()),
        _ => (false, "No se encontró firma digital en el documento".to_string()),
    }
}

fn nombre_de_raiz(xml: &str) -> Result<String, FirmaError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(elemento)) => {
                return Ok(String::from_utf8_lossy(elemento.name().as_ref()).to_string());
            }
            Ok(Event::Eof) => {
                return Err(FirmaError::XmlIlegible("documento sin elemento raíz".into()))
            }
            Err(fallo) => return Err(FirmaError::XmlIlegible(fallo.to_string())),
            _ => {}
        }
    }
}

fn escribir(writer: &mut Writer<Vec<u8>>, evento: Event<'_>) -> Result<(), FirmaError> {
    writer
        .write_event(evento)
        .map_err(|fallo| FirmaError::XmlIlegible(fallo.to_string()))
}

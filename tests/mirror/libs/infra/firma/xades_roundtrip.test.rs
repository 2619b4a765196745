// [tests/mirror/libs/infra/firma/xades_roundtrip.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL CICLO DE FIRMA XADES-BES (V1.4 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE CARGA PKCS#12, FIRMA Y VERIFICACIÓN
 *
 * El test genera credenciales PKCS#12 desechables (vigente y vencida)
 * con el propio motor criptográfico; no hay material de firma real en
 * el repositorio.
 * =================================================================
 */

use std::io::Write;

use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use openssl::x509::{X509Builder, X509NameBuilder};

use factel_infra_firma::{canonicalizar, firmar_comprobante, verificar_firma, Certificado, FirmaError};

const CONTRASENA: &str = "clave-de-prueba";

/// Genera un contenedor PKCS#12 desechable con la ventana de vigencia dada.
fn generar_p12(no_antes_unix: i64, no_despues_unix: i64) -> Vec<u8> {
    let rsa = Rsa::generate(2048).unwrap();
    let clave = PKey::from_rsa(rsa).unwrap();

    let mut nombre = X509NameBuilder::new().unwrap();
    nombre.append_entry_by_nid(Nid::COMMONNAME, "FACTEL PRUEBAS").unwrap();
    let nombre = nombre.build();

    let mut constructor = X509Builder::new().unwrap();
    constructor.set_version(2).unwrap();

    let serie = {
        let mut bn = BigNum::new().unwrap();
        bn.rand(64, MsbOption::MAYBE_ZERO, false).unwrap();
        bn.to_asn1_integer().unwrap()
    };
    constructor.set_serial_number(&serie).unwrap();
    constructor.set_subject_name(&nombre).unwrap();
    constructor.set_issuer_name(&nombre).unwrap();
    constructor.set_pubkey(&clave).unwrap();
    constructor
        .set_not_before(Asn1Time::from_unix(no_antes_unix).unwrap().as_ref())
        .unwrap();
    constructor
        .set_not_after(Asn1Time::from_unix(no_despues_unix).unwrap().as_ref())
        .unwrap();
    constructor.sign(&clave, MessageDigest::sha256()).unwrap();
    let certificado = constructor.build();

    Pkcs12::builder()
        .name("factel")
        .pkey(&clave)
        .cert(&certificado)
        .build2(CONTRASENA)
        .unwrap()
        .to_der()
        .unwrap()
}

fn escribir_temporal(bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut archivo = tempfile::NamedTempFile::new().unwrap();
    archivo.write_all(bytes).unwrap();
    archivo.flush().unwrap();
    archivo
}

fn ahora_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

const XML_COMPROBANTE: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
<factura id=\"comprobante\" version=\"1.1.0\">\
<infoTributaria><ambiente>1</ambiente><ruc>1791234567001</ruc></infoTributaria>\
<infoFactura><importeTotal>26.88</importeTotal></infoFactura>\
</factura>";

#[test]
fn certificar_firma_envolvente_completa() {
    println!("\n✍️  [INICIO]: Auditoría del ciclo completo de firma XAdES-BES...");

    let vigencia = ahora_unix();
    let p12 = generar_p12(vigencia - 86_400, vigencia + 365 * 86_400);
    let archivo = escribir_temporal(&p12);

    let credencial = Certificado::cargar(archivo.path(), CONTRASENA).unwrap();
    let xml_firmado = firmar_comprobante(XML_COMPROBANTE, &credencial).unwrap();

    // La firma es el último hijo de la raíz, con el perfil BES mínimo.
    assert!(xml_firmado.contains("<ds:Signature xmlns:ds=\"http://www.w3.org/2000/09/xmldsig#\""));
    assert!(xml_firmado.contains("<ds:SignedInfo>"));
    assert!(xml_firmado.contains("Algorithm=\"http://www.w3.org/2000/09/xmldsig#rsa-sha1\""));
    assert!(xml_firmado.contains("Algorithm=\"http://www.w3.org/TR/2001/REC-xml-c14n-20010315\""));
    assert!(xml_firmado.contains("<ds:DigestValue>"));
    assert!(xml_firmado.contains("<ds:SignatureValue>"));
    assert!(xml_firmado.contains("<ds:X509Certificate>"));
    assert!(xml_firmado.ends_with("</ds:Signature></factura>"));

    // El certificado embebido coincide con la hoja del firmador.
    let hoja_base64 = {
        use openssl::base64::encode_block;
        encode_block(&credencial.hoja_der().unwrap())
    };
    assert!(xml_firmado.contains(&hoja_base64));

    // Verificación estructural.
    let (valida, mensaje) = verificar_firma(&xml_firmado);
    assert!(valida, "verificación rechazada: {}", mensaje);

    println!("🏁 [INFORME]: Firma envolvente certificada.");
}

#[test]
fn certificar_determinismo_de_la_firma() {
    let vigencia = ahora_unix();
    let p12 = generar_p12(vigencia - 86_400, vigencia + 365 * 86_400);
    let archivo = escribir_temporal(&p12);
    let credencial = Certificado::cargar(archivo.path(), CONTRASENA).unwrap();

    // RSA-SHA1 con PKCS#1 v1.5 es determinista: misma entrada, mismos bytes.
    let primera = firmar_comprobante(XML_COMPROBANTE, &credencial).unwrap();
    let segunda = firmar_comprobante(XML_COMPROBANTE, &credencial).unwrap();
    assert_eq!(primera, segunda);
}

#[test]
fn certificar_certificado_vencido_s4() {
    // Escenario S4: notAfter = 2020-01-01 (1577836800).
    let p12 = generar_p12(1_546_300_800, 1_577_836_800);
    let archivo = escribir_temporal(&p12);

    let resultado = Certificado::cargar(archivo.path(), CONTRASENA);
    assert!(matches!(resultado, Err(FirmaError::CertificadoVencido(_))));
}

#[test]
fn certificar_contrasena_incorrecta() {
    let vigencia = ahora_unix();
    let p12 = generar_p12(vigencia - 86_400, vigencia + 365 * 86_400);
    let archivo = escribir_temporal(&p12);

    let resultado = Certificado::cargar(archivo.path(), "contraseña-equivocada");
    assert!(matches!(resultado, Err(FirmaError::ContrasenaIncorrecta)));
}

#[test]
fn certificar_certificado_ausente() {
    let resultado = Certificado::cargar(std::path::Path::new("/ruta/fantasma.p12"), CONTRASENA);
    assert!(matches!(resultado, Err(FirmaError::CertificadoNoEncontrado(_))));
}

#[test]
fn certificar_digest_sobre_forma_canonica() {
    // El digest se calcula sobre el documento canónico sin declaración.
    let canonico = canonicalizar(XML_COMPROBANTE).unwrap();
    let texto = String::from_utf8(canonico).unwrap();
    assert!(texto.starts_with("<factura"));
    assert!(!texto.contains("<?xml"));
}

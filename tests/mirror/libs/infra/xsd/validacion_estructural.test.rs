// [tests/mirror/libs/infra/xsd/validacion_estructural.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL VALIDADOR DE ESQUEMAS (V1.2 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DEL RETROCESO ESTRUCTURAL Y LA CACHÉ XSD
 * =================================================================
 */

use factel_domain_models::TipoComprobante;
use factel_infra_xsd::ValidadorXsd;

const XML_NOMINAL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<factura id="comprobante" version="1.1.0">
    <infoTributaria>
        <ambiente>1</ambiente>
        <tipoEmision>1</tipoEmision>
        <razonSocial>REPUESTOS EC S.A.</razonSocial>
        <ruc>1791234567001</ruc>
        <claveAcceso>2202202601179123456700110010010000000011234567818</claveAcceso>
        <codDoc>01</codDoc>
        <estab>001</estab>
        <ptoEmision>001</ptoEmision>
        <secuencial>000000001</secuencial>
        <dirMatriz>Av. Amazonas N26-12</dirMatriz>
    </infoTributaria>
    <infoFactura>
        <fechaEmision>22/02/2026</fechaEmision>
        <totalSinImpuestos>24.00</totalSinImpuestos>
        <importeTotal>26.88</importeTotal>
    </infoFactura>
    <detalles><detalle>
        <codigoPrincipal>FIL-001</codigoPrincipal>
        <descripcion>Filtro de aceite</descripcion>
        <cantidad>2</cantidad>
        <precioUnitario>12.00</precioUnitario>
        <precioTotalSinImpuesto>24.00</precioTotalSinImpuesto>
    </detalle></detalles>
</factura>"#;

#[test]
fn certificar_fallback_con_directorio_vacio() {
    println!("\n📜 [INICIO]: Auditoría del retroceso estructural...");

    // Directorio real pero sin archivos XSD: todo tipo cae al fallback.
    let directorio = tempfile::tempdir().unwrap();
    let validador = ValidadorXsd::new(directorio.path());

    let veredicto = validador.validar(XML_NOMINAL, TipoComprobante::Factura);
    assert!(veredicto.es_valido, "errores: {:?}", veredicto.errores);
    assert!(!veredicto.con_esquema);

    println!("🏁 [INFORME]: Retroceso estructural certificado.");
}

#[test]
fn certificar_diagnosticos_del_fallback() {
    let directorio = tempfile::tempdir().unwrap();
    let validador = ValidadorXsd::new(directorio.path());

    // Sin claveAcceso ni infoFactura: dos diagnósticos esperados.
    let mutilado = XML_NOMINAL
        .replace("<claveAcceso>2202202601179123456700110010010000000011234567818</claveAcceso>", "")
        .replace("infoFactura", "infoAjena");

    let veredicto = validador.validar(&mutilado, TipoComprobante::Factura);
    assert!(!veredicto.es_valido);
    assert!(veredicto.errores.iter().any(|e| e.contains("claveAcceso")));
    assert!(veredicto.errores.iter().any(|e| e.contains("infoFactura")));
}

#[test]
fn certificar_raiz_por_tipo_de_comprobante() {
    let directorio = tempfile::tempdir().unwrap();
    let validador = ValidadorXsd::new(directorio.path());

    // El árbol de factura no valida como nota de crédito.
    let veredicto = validador.validar(XML_NOMINAL, TipoComprobante::NotaCredito);
    assert!(!veredicto.es_valido);
    assert!(veredicto
        .errores
        .iter()
        .any(|e| e.contains("Elemento raíz desconocido")));
}

#[test]
fn certificar_esquema_fisico_cacheado() {
    // Un XSD laxo presente en disco debe usarse en lugar del fallback.
    let directorio = tempfile::tempdir().unwrap();
    let esquema_laxo = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="factura">
    <xs:complexType>
      <xs:sequence>
        <xs:any processContents="skip" minOccurs="0" maxOccurs="unbounded"/>
      </xs:sequence>
      <xs:attribute name="id" type="xs:string"/>
      <xs:attribute name="version" type="xs:string"/>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;
    std::fs::write(directorio.path().join("factura.xsd"), esquema_laxo).unwrap();

    let validador = ValidadorXsd::new(directorio.path());
    let veredicto = validador.validar(XML_NOMINAL, TipoComprobante::Factura);

    assert!(veredicto.con_esquema);
    assert!(veredicto.es_valido, "errores: {:?}", veredicto.errores);

    // Los demás tipos siguen cayendo al retroceso estructural.
    let ajeno = validador.validar(XML_NOMINAL, TipoComprobante::NotaCredito);
    assert!(!ajeno.con_esquema);
}

// [tests/mirror/libs/domain/comprobante/factura_builder.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL CONSTRUCTOR DE FACTURAS (V1.3)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DEL ÁRBOL XML Y DE LA RECONCILIACIÓN
 * =================================================================
 */

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use factel_domain_comprobante::{construir_factura, validar_venta, BuilderError};
use factel_domain_models::{
    ConfiguracionEmisor, LineaVenta, TipoContribuyente, TipoIdentificacion, VentaView,
};

fn emisor_nominal() -> ConfiguracionEmisor {
    ConfiguracionEmisor {
        ruc: "1791234567001".to_string(),
        razon_social: "REPUESTOS EC S.A.".to_string(),
        nombre_comercial: Some("RepuestosEC".to_string()),
        direccion_matriz: "Av. Amazonas N26-12, Quito".to_string(),
        direccion_sucursal: None,
        telefono: Some("022555555".to_string()),
        email: Some("ventas@repuestosec.ec".to_string()),
        establecimiento: "001".to_string(),
        punto_emision: "001".to_string(),
        iva_tarifa: dec!(12),
        obligado_contabilidad: true,
        contribuyente_especial: false,
        resolucion_contribuyente: None,
        tipo_contribuyente: TipoContribuyente::Sociedad,
        certificado_path: "certificado.p12".to_string(),
        certificado_password: String::new(),
        ambiente: "1".to_string(),
        tipo_emision: "1".to_string(),
        email_asunto_plantilla: "Comprobante Electrónico - Factura {numero}".to_string(),
    }
}

/// Venta del escenario S1: FIL-001, 2 unidades a 12.00, sin descuento.
fn venta_s1() -> VentaView {
    VentaView::consumidor_final_anonimo(
        NaiveDate::from_ymd_opt(2026, 2, 22).unwrap(),
        vec![LineaVenta {
            codigo: "FIL-001".to_string(),
            descripcion: "Filtro de aceite".to_string(),
            cantidad: dec!(2),
            precio_unitario: dec!(12.00),
            descuento: dec!(0.00),
            subtotal: dec!(24.00),
        }],
        dec!(24.00),
        dec!(0.00),
        dec!(0.00),
        dec!(2.88),
        dec!(26.88),
    )
}

#[test]
fn certificar_arbol_s1_consumidor_final() {
    println!("\n🧾 [INICIO]: Auditoría del árbol XML para el escenario S1...");

    let factura = construir_factura(&venta_s1(), &emisor_nominal(), 1, "12345678").unwrap();

    // Identificadores para la persistencia pre-firma.
    assert_eq!(factura.numero_formateado, "001-001-000000001");
    assert_eq!(factura.clave_acceso.len(), 49);
    assert!(factura.clave_acceso.starts_with("22022026011791234567001"));

    // Estructura reglamentaria del árbol.
    let xml = &factura.xml;
    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(xml.contains("<factura id=\"comprobante\" version=\"1.1.0\">"));
    assert!(xml.contains("<codDoc>01</codDoc>"));
    assert!(xml.contains("<secuencial>000000001</secuencial>"));
    assert!(xml.contains(&format!("<claveAcceso>{}</claveAcceso>", factura.clave_acceso)));

    // Comprador anónimo: consumidor final con identidad de retroceso.
    assert!(xml.contains("<tipoIdentificacionComprador>07</tipoIdentificacionComprador>"));
    assert!(xml.contains("<identificacionComprador>9999999999</identificacionComprador>"));
    assert!(xml.contains("<razonSocialComprador>CONSUMIDOR FINAL</razonSocialComprador>"));

    // Reconciliación monetaria: 24.00 + 2.88 = 26.88.
    assert!(xml.contains("<totalSinImpuestos>24.00</totalSinImpuestos>"));
    assert!(xml.contains("<importeTotal>26.88</importeTotal>"));
    assert!(xml.contains("<baseImponible>24.00</baseImponible>"));
    assert!(xml.contains("<valor>2.88</valor>"));
    assert!(xml.contains("<moneda>DOLAR</moneda>"));

    // Exactamente un detalle.
    assert_eq!(xml.matches("<detalle>").count(), 1);
    assert!(xml.contains("<codigoPrincipal>FIL-001</codigoPrincipal>"));
    assert!(xml.contains("<cantidad>2</cantidad>"));

    println!("🏁 [INFORME]: Árbol S1 certificado. Clave: {}", factura.clave_acceso);
}

#[test]
fn certificar_descuadre_monetario_aborta() {
    let mut venta = venta_s1();
    venta.total = dec!(99.00);

    let resultado = construir_factura(&venta, &emisor_nominal(), 1, "12345678");
    assert!(matches!(resultado, Err(BuilderError::DescuadreMonetario { .. })));
}

#[test]
fn certificar_guardia_de_frontera_sin_consumo() {
    // RUC del emisor ilegal: la venta se rechaza antes de crear nada.
    let mut emisor = emisor_nominal();
    emisor.ruc = "179".to_string();
    assert!(validar_venta(&venta_s1(), &emisor).is_err());

    // Cédula del comprador ilegal.
    let mut venta = venta_s1();
    venta.comprador_tipo_identificacion = TipoIdentificacion::Cedula;
    venta.comprador_identificacion = "1712345678".to_string();
    assert!(validar_venta(&venta, &emisor_nominal()).is_err());
}

#[test]
fn certificar_cubeta_cero_y_tarifa_mixta() {
    let mut venta = venta_s1();
    venta.detalles.push(LineaVenta {
        codigo: "LIB-001".to_string(),
        descripcion: "Manual técnico".to_string(),
        cantidad: dec!(1),
        precio_unitario: dec!(10.00),
        descuento: dec!(0.00),
        subtotal: dec!(10.00),
    });
    venta.subtotal_0 = dec!(10.00);
    venta.total = dec!(36.88);

    let factura = construir_factura(&venta, &emisor_nominal(), 2, "12345678").unwrap();

    // Dos cubetas: la gravada al 12% y la de tarifa cero.
    assert_eq!(factura.xml.matches("<totalImpuesto>").count(), 2);
    assert!(factura.xml.contains("<totalSinImpuestos>34.00</totalSinImpuestos>"));
    assert!(factura.xml.contains("<importeTotal>36.88</importeTotal>"));
}

#[test]
fn certificar_contribuyente_especial_condicional() {
    let mut emisor = emisor_nominal();
    let sin_bloque = construir_factura(&venta_s1(), &emisor, 3, "12345678").unwrap();
    assert!(!sin_bloque.xml.contains("contribuyenteEspecial"));

    emisor.contribuyente_especial = true;
    emisor.resolucion_contribuyente = Some("5368".to_string());
    let con_bloque = construir_factura(&venta_s1(), &emisor, 4, "12345678").unwrap();
    assert!(con_bloque.xml.contains("<contribuyenteEspecial>5368</contribuyenteEspecial>"));
}

#[test]
fn certificar_escape_de_texto() {
    let mut venta = venta_s1();
    venta.detalles[0].descripcion = "Filtro <premium> & sello".to_string();

    let factura = construir_factura(&venta, &emisor_nominal(), 5, "12345678").unwrap();
    assert!(factura.xml.contains("Filtro &lt;premium&gt; &amp; sello"));
}

#[test]
fn certificar_tarifa_data_driven() {
    let mut emisor = emisor_nominal();
    emisor.iva_tarifa = Decimal::from(14);

    let mut venta = venta_s1();
    venta.iva = dec!(3.36);
    venta.total = dec!(27.36);

    let factura = construir_factura(&venta, &emisor, 6, "12345678").unwrap();
    assert!(factura.xml.contains("<codigoPorcentaje>3</codigoPorcentaje>"));
    assert!(factura.xml.contains("<tarifa>14</tarifa>"));
}

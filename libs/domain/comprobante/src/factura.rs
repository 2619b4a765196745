// [libs/domain/comprobante/src/factura.rs]
/*!
 * =================================================================
 * APARATO: CONSTRUCTOR DE FACTURA ELECTRÓNICA (V4.2 - WIRE EXACT)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: EMISIÓN DEL ÁRBOL <factura> VERSIÓN 1.1.0
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. BOUNDARY GUARD: El RUC del emisor y la cédula del comprador se
 *    validan ANTES de consumir entropía o construir el árbol; una venta
 *    ilegal jamás produce un comprobante.
 * 2. PERSISTENCE FIRST: El retorno incluye clave y número formateado
 *    para que el orquestador los persista antes de la firma.
 * =================================================================
 */

use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use factel_core_sri::{
    formatear_numero, generar_clave_acceso, validar_cedula, validar_ruc, ParametrosClave,
};
use factel_domain_models::{ConfiguracionEmisor, TipoIdentificacion, VentaView};

use crate::errors::BuilderError;
use crate::montos::{codigo_porcentaje_iva, monto2, ResumenMontos};

/// Resultado de la construcción: XML canónico-listo más los identificadores
/// que el orquestador debe persistir antes de la firma.
#[derive(Debug, Clone)]
pub struct FacturaConstruida {
    /// XML UTF-8 con declaración, sin firma.
    pub xml: String,
    pub clave_acceso: String,
    pub numero_formateado: String,
    pub secuencial: u32,
}

/**
 * Guardia de frontera: valida identificaciones y reconciliación ANTES de
 * que el orquestador consuma un secuencial. Una venta que falla aquí
 * jamás produce un comprobante.
 *
 * # Errors:
 * - `Identificacion` / `VentaInvalida` / `DescuadreMonetario`.
 */
pub fn validar_venta(venta: &VentaView, emisor: &ConfiguracionEmisor) -> Result<(), BuilderError> {
    validar_ruc(&emisor.ruc)?;
    match venta.comprador_tipo_identificacion {
        TipoIdentificacion::Cedula => validar_cedula(&venta.comprador_identificacion)?,
        TipoIdentificacion::Ruc => validar_ruc(&venta.comprador_identificacion)?,
        TipoIdentificacion::Pasaporte | TipoIdentificacion::ConsumidorFinal => {}
    }
    ResumenMontos::reconciliar(venta, emisor.iva_tarifa).map(|_| ())
}

/**
 * Construye el árbol `<factura id="comprobante" version="1.1.0">` completo.
 *
 * # Logic:
 * 1. Valida identificaciones en la frontera (RUC del emisor, cédula/RUC
 *    del comprador según su tipo).
 * 2. Reconcilia los montos de la venta contra la tolerancia legal.
 * 3. Genera la clave de acceso con el código numérico inyectado.
 * 4. Emite infoTributaria, infoFactura y detalles en el orden oficial.
 *
 * # Errors:
 * - `Identificacion` / `VentaInvalida` / `DescuadreMonetario` en frontera.
 * - `Xml` ante un colapso del motor de serialización.
 */
#[instrument(skip(venta, emisor, codigo_numerico))]
pub fn construir_factura(
    venta: &VentaView,
    emisor: &ConfiguracionEmisor,
    secuencial: u32,
    codigo_numerico: &str,
) -> Result<FacturaConstruida, BuilderError> {
    // --- FASE 1: GUARDIA DE FRONTERA ---
    validar_venta(venta, emisor)?;

    // --- FASE 2: RECONCILIACIÓN MONETARIA ---
    let resumen = ResumenMontos::reconciliar(venta, emisor.iva_tarifa)?;

    // --- FASE 3: CLAVE DE ACCESO ---
    let clave_acceso = generar_clave_acceso(
        &ParametrosClave {
            fecha_emision: venta.fecha_emision,
            tipo_comprobante: "01",
            ruc: &emisor.ruc,
            ambiente: &emisor.ambiente,
            establecimiento: &emisor.establecimiento,
            punto_emision: &emisor.punto_emision,
            secuencial,
            tipo_emision: &emisor.tipo_emision,
        },
        codigo_numerico,
    )?;

    let numero_formateado =
        formatear_numero(&emisor.establecimiento, &emisor.punto_emision, secuencial);

    // --- FASE 4: EMISIÓN DEL ÁRBOL ---
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(a_fallo_xml)?;

    let mut raiz = BytesStart::new("factura");
    raiz.push_attribute(("id", "comprobante"));
    raiz.push_attribute(("version", "1.1.0"));
    writer.write_event(Event::Start(raiz)).map_err(a_fallo_xml)?;

    emitir_info_tributaria(&mut writer, emisor, &clave_acceso, secuencial)?;
    emitir_info_factura(&mut writer, venta, emisor, &resumen)?;
    emitir_detalles(&mut writer, venta, emisor.iva_tarifa)?;

    writer
        .write_event(Event::End(BytesEnd::new("factura")))
        .map_err(a_fallo_xml)?;

    let xml = String::from_utf8(writer.into_inner().into_inner())
        .map_err(|fallo| BuilderError::Xml(fallo.to_string()))?;

    debug!(
        "🧾 [BUILDER]: Invoice tree emitted. Clave: [{}], Número: [{}]",
        clave_acceso, numero_formateado
    );

    Ok(FacturaConstruida {
        xml,
        clave_acceso,
        numero_formateado,
        secuencial,
    })
}

fn emitir_info_tributaria<W: std::io::Write>(
    writer: &mut Writer<W>,
    emisor: &ConfiguracionEmisor,
    clave_acceso: &str,
    secuencial: u32,
) -> Result<(), BuilderError> {
    abrir(writer, "infoTributaria")?;

    campo(writer, "ambiente", &emisor.ambiente)?;
    campo(writer, "tipoEmision", &emisor.tipo_emision)?;
    campo(writer, "razonSocial", &emisor.razon_social)?;
    campo(writer, "nombreComercial", emisor.nombre_comercial_efectivo())?;
    campo(writer, "ruc", &emisor.ruc)?;
    campo(writer, "claveAcceso", clave_acceso)?;
    campo(writer, "codDoc", "01")?;
    campo(writer, "estab", &emisor.establecimiento)?;
    campo(writer, "ptoEmision", &emisor.punto_emision)?;
    campo(writer, "secuencial", &format!("{:09}", secuencial))?;
    campo(writer, "dirMatriz", &emisor.direccion_matriz)?;

    cerrar(writer, "infoTributaria")
}

fn emitir_info_factura<W: std::io::Write>(
    writer: &mut Writer<W>,
    venta: &VentaView,
    emisor: &ConfiguracionEmisor,
    resumen: &ResumenMontos,
) -> Result<(), BuilderError> {
    abrir(writer, "infoFactura")?;

    campo(
        writer,
        "fechaEmision",
        &venta.fecha_emision.format("%d/%m/%Y").to_string(),
    )?;
    campo(
        writer,
        "dirEstablecimiento",
        emisor.direccion_establecimiento_efectiva(),
    )?;
    campo(
        writer,
        "tipoIdentificacionComprador",
        venta.comprador_tipo_identificacion.codigo_sri(),
    )?;
    campo(writer, "razonSocialComprador", &venta.comprador_nombre)?;
    campo(writer, "identificacionComprador", venta.identificacion_efectiva())?;
    campo(
        writer,
        "direccionComprador",
        venta.comprador_direccion.as_deref().unwrap_or("N/A"),
    )?;
    campo(
        writer,
        "telefonoComprador",
        venta.comprador_telefono.as_deref().unwrap_or(""),
    )?;
    campo(
        writer,
        "emailComprador",
        venta.comprador_email.as_deref().unwrap_or(""),
    )?;
    campo(
        writer,
        "obligadoContabilidad",
        if emisor.obligado_contabilidad { "SI" } else { "NO" },
    )?;

    if emisor.contribuyente_especial {
        campo(
            writer,
            "contribuyenteEspecial",
            emisor.resolucion_contribuyente.as_deref().unwrap_or("N/A"),
        )?;
    }

    campo(writer, "tipoProveedor", emisor.tipo_contribuyente.codigo())?;

    campo(writer, "totalSinImpuestos", &monto2(resumen.total_sin_impuestos))?;
    campo(writer, "totalDescuento", &monto2(resumen.total_descuento))?;

    for cubeta in &resumen.cubetas {
        abrir(writer, "totalImpuesto")?;
        campo(writer, "codigo", "2")?;
        campo(writer, "codigoPorcentaje", cubeta.codigo_porcentaje)?;
        campo(writer, "baseImponible", &monto2(cubeta.base_imponible))?;
        campo(writer, "valor", &monto2(cubeta.valor))?;
        cerrar(writer, "totalImpuesto")?;
    }

    campo(writer, "importeTotal", &monto2(resumen.importe_total))?;
    campo(writer, "moneda", "DOLAR")?;

    abrir(writer, "pagos")?;
    abrir(writer, "pago")?;
    campo(writer, "formaPago", &venta.forma_pago)?;
    campo(writer, "valor", &monto2(resumen.importe_total))?;
    cerrar(writer, "pago")?;
    cerrar(writer, "pagos")?;

    cerrar(writer, "infoFactura")
}

fn emitir_detalles<W: std::io::Write>(
    writer: &mut Writer<W>,
    venta: &VentaView,
    iva_tarifa: Decimal,
) -> Result<(), BuilderError> {
    abrir(writer, "detalles")?;

    for linea in &venta.detalles {
        abrir(writer, "detalle")?;

        campo(writer, "codigoPrincipal", &linea.codigo)?;
        campo(writer, "descripcion", &linea.descripcion)?;
        campo(writer, "cantidad", &linea.cantidad.normalize().to_string())?;
        campo(writer, "precioUnitario", &monto2(linea.precio_unitario))?;
        campo(writer, "descuento", &monto2(linea.descuento))?;
        campo(writer, "precioTotalSinImpuesto", &monto2(linea.subtotal))?;

        abrir(writer, "impuestos")?;
        abrir(writer, "impuesto")?;
        campo(writer, "codigo", "2")?;
        campo(writer, "codigoPorcentaje", codigo_porcentaje_iva(iva_tarifa))?;
        campo(writer, "tarifa", &format!("{:.0}", iva_tarifa))?;
        campo(writer, "baseImponible", &monto2(linea.subtotal))?;
        campo(
            writer,
            "valor",
            &monto2(linea.subtotal * iva_tarifa / Decimal::from(100)),
        )?;
        cerrar(writer, "impuesto")?;
        cerrar(writer, "impuestos")?;

        cerrar(writer, "detalle")?;
    }

    cerrar(writer, "detalles")
}

// --- PRIMITIVAS DE ESCRITURA ---

fn abrir<W: std::io::Write>(writer: &mut Writer<W>, etiqueta: &str) -> Result<(), BuilderError> {
    writer
        .write_event(Event::Start(BytesStart::new(etiqueta)))
        .map_err(a_fallo_xml)
}

fn cerrar<W: std::io::Write>(writer: &mut Writer<W>, etiqueta: &str) -> Result<(), BuilderError> {
    writer
        .write_event(Event::End(BytesEnd::new(etiqueta)))
        .map_err(a_fallo_xml)
}

fn campo<W: std::io::Write>(
    writer: &mut Writer<W>,
    etiqueta: &str,
    valor: &str,
) -> Result<(), BuilderError> {
    abrir(writer, etiqueta)?;
    writer
        .write_event(Event::Text(BytesText::new(valor)))
        .map_err(a_fallo_xml)?;
    cerrar(writer, etiqueta)
}

fn a_fallo_xml(fallo: impl std::fmt::Display) -> BuilderError {
    BuilderError::Xml(fallo.to_string())
}

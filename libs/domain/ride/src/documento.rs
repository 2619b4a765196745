// [libs/domain/ride/src/documento.rs]
/*!
 * =================================================================
 * APARATO: ENSAMBLADOR DEL DOCUMENTO RIDE (V3.2 - A4 FIJO)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: LAYOUT DE UNA PÁGINA CON BLOQUES REGLAMENTARIOS
 *
 * Bloques reglamentarios: cabecera del emisor, caja de autorización,
 * comprador, tabla de detalle, totales, forma de pago, Code128 y QR
 * de la clave de acceso.
 * =================================================================
 */

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, instrument};

use factel_domain_models::{Comprobante, ConfiguracionEmisor, VentaView};

use crate::codigos::{ancho_code128, operaciones_code128, operaciones_qr, texto};
use crate::RideError;

// Geometría A4 en puntos.
const ANCHO_PAGINA: f64 = 595.28;
const ALTO_PAGINA: f64 = 841.89;
const MARGEN: f64 = 40.0;

/// Altura de una fila de detalle.
const PASO_FILA: f64 = 14.0;
/// Filas máximas antes de truncar (el RIDE es de página única).
const FILAS_MAXIMAS: usize = 28;

fn monto(valor: Decimal) -> String {
    format!(
        "{:.2}",
        valor.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

/**
 * Ensambla el PDF RIDE de una página y devuelve sus bytes.
 *
 * # Errors:
 * - `Pdf` ante un colapso del ensamblador lopdf.
 * - `CodigoBarras` / `CodigoQr` si la clave no proyecta a simbología.
 */
#[instrument(skip(comprobante, venta, emisor))]
pub fn generar_ride(
    comprobante: &Comprobante,
    venta: &VentaView,
    emisor: &ConfiguracionEmisor,
) -> Result<Vec<u8>, RideError> {
    let mut operaciones: Vec<Operation> = Vec::new();
    let mut cursor_y = ALTO_PAGINA - MARGEN - 10.0;

    // --- BLOQUE 1: CABECERA DEL EMISOR ---
    operaciones.extend(texto("F2", 13.0, MARGEN, cursor_y, &emisor.razon_social));
    cursor_y -= 16.0;
    operaciones.extend(texto(
        "F1",
        9.0,
        MARGEN,
        cursor_y,
        &format!("RUC: {}", emisor.ruc),
    ));
    cursor_y -= 12.0;
    operaciones.extend(texto(
        "F1",
        9.0,
        MARGEN,
        cursor_y,
        &format!("Matriz: {}", emisor.direccion_matriz),
    ));
    cursor_y -= 12.0;
    operaciones.extend(texto(
        "F1",
        9.0,
        MARGEN,
        cursor_y,
        &format!(
            "Sucursal: {}",
            emisor.direccion_establecimiento_efectiva()
        ),
    ));
    if let Some(telefono) = emisor.telefono.as_deref() {
        cursor_y -= 12.0;
        operaciones.extend(texto("F1", 9.0, MARGEN, cursor_y, &format!("Teléfono: {}", telefono)));
    }

    // --- BLOQUE 2: CAJA DE AUTORIZACIÓN (columna derecha) ---
    let caja_x = 320.0;
    let mut caja_y = ALTO_PAGINA - MARGEN - 10.0;

    operaciones.extend(texto(
        "F2",
        12.0,
        caja_x,
        caja_y,
        &format!("FACTURA No. {}", comprobante.numero_formateado()),
    ));
    caja_y -= 14.0;
    operaciones.extend(texto("F2", 8.0, caja_x, caja_y, "NÚMERO DE AUTORIZACIÓN:"));
    caja_y -= 10.0;
    operaciones.extend(texto(
        "F1",
        7.0,
        caja_x,
        caja_y,
        comprobante.numero_autorizacion.as_deref().unwrap_or(""),
    ));
    caja_y -= 12.0;
    operaciones.extend(texto(
        "F1",
        8.0,
        caja_x,
        caja_y,
        &format!(
            "Fecha autorización: {}",
            comprobante.fecha_autorizacion.as_deref().unwrap_or("")
        ),
    ));
    caja_y -= 12.0;
    operaciones.extend(texto(
        "F1",
        8.0,
        caja_x,
        caja_y,
        &format!(
            "Ambiente: {}",
            if comprobante.ambiente.codigo() == "2" { "PRODUCCIÓN" } else { "PRUEBAS" }
        ),
    ));
    caja_y -= 12.0;
    operaciones.extend(texto("F2", 8.0, caja_x, caja_y, "CLAVE DE ACCESO:"));
    caja_y -= 10.0;
    operaciones.extend(texto("F1", 6.5, caja_x, caja_y, &comprobante.clave_acceso));

    cursor_y = cursor_y.min(caja_y) - 24.0;

    // --- BLOQUE 3: COMPRADOR ---
    operaciones.extend(linea_horizontal(cursor_y + 10.0));
    operaciones.extend(texto(
        "F2",
        9.0,
        MARGEN,
        cursor_y,
        &format!("Razón social: {}", venta.comprador_nombre),
    ));
    operaciones.extend(texto(
        "F1",
        9.0,
        360.0,
        cursor_y,
        &format!("Identificación: {}", venta.identificacion_efectiva()),
    ));
    cursor_y -= 12.0;
    operaciones.extend(texto(
        "F1",
        9.0,
        MARGEN,
        cursor_y,
        &format!(
            "Dirección: {}",
            venta.comprador_direccion.as_deref().unwrap_or("N/A")
        ),
    ));
    operaciones.extend(texto(
        "F1",
        9.0,
        360.0,
        cursor_y,
        &format!("Fecha emisión: {}", venta.fecha_emision.format("%d/%m/%Y")),
    ));
    cursor_y -= 20.0;

    // --- BLOQUE 4: TABLA DE DETALLE ---
    // Columnas: Código | Descripción | Cant. | P. Unit | Dcto. | Total
    let columnas: [(f64, &str); 6] = [
        (MARGEN, "Código"),
        (110.0, "Descripción"),
        (330.0, "Cant."),
        (390.0, "P. Unitario"),
        (460.0, "Dcto."),
        (510.0, "Total"),
    ];

    operaciones.extend(linea_horizontal(cursor_y + 10.0));
    for (x, titulo) in columnas {
        operaciones.extend(texto("F2", 9.0, x, cursor_y, titulo));
    }
    cursor_y -= 4.0;
    operaciones.extend(linea_horizontal(cursor_y));
    cursor_y -= PASO_FILA;

    let visibles = venta.detalles.iter().take(FILAS_MAXIMAS);
    for linea in visibles {
        operaciones.extend(texto("F1", 8.0, columnas[0].0, cursor_y, &linea.codigo));
        operaciones.extend(texto("F1", 8.0, columnas[1].0, cursor_y, &recortar(&linea.descripcion, 44)));
        operaciones.extend(texto("F1", 8.0, columnas[2].0, cursor_y, &linea.cantidad.normalize().to_string()));
        operaciones.extend(texto("F1", 8.0, columnas[3].0, cursor_y, &monto(linea.precio_unitario)));
        operaciones.extend(texto("F1", 8.0, columnas[4].0, cursor_y, &monto(linea.descuento)));
        operaciones.extend(texto("F1", 8.0, columnas[5].0, cursor_y, &monto(linea.subtotal)));
        cursor_y -= PASO_FILA;
    }

    if venta.detalles.len() > FILAS_MAXIMAS {
        operaciones.extend(texto(
            "F1",
            8.0,
            columnas[1].0,
            cursor_y,
            &format!("... y {} líneas adicionales", venta.detalles.len() - FILAS_MAXIMAS),
        ));
        cursor_y -= PASO_FILA;
    }

    operaciones.extend(linea_horizontal(cursor_y + 6.0));
    cursor_y -= 6.0;

    // --- BLOQUE 5: TOTALES (columna derecha) ---
    let etiqueta_x = 390.0;
    let valor_x = 510.0;
    let totales: [(&str, String); 5] = [
        ("SUBTOTAL 12%", monto(venta.subtotal_12)),
        ("SUBTOTAL 0%", monto(venta.subtotal_0)),
        ("DESCUENTO", monto(venta.descuento)),
        ("IVA", monto(venta.iva)),
        ("VALOR TOTAL", monto(venta.total)),
    ];

    for (etiqueta, valor) in totales {
        let fuente = if etiqueta == "VALOR TOTAL" { "F2" } else { "F1" };
        operaciones.extend(texto(fuente, 9.0, etiqueta_x, cursor_y, etiqueta));
        operaciones.extend(texto(fuente, 9.0, valor_x, cursor_y, &valor));
        cursor_y -= 12.0;
    }

    // --- BLOQUE 6: FORMA DE PAGO ---
    operaciones.extend(texto(
        "F1",
        9.0,
        MARGEN,
        cursor_y + 48.0,
        &format!("Forma de pago: {}", nombre_forma_pago(&venta.forma_pago)),
    ));

    // --- BLOQUE 7: SIMBOLOGÍAS DE LA CLAVE ---
    let base_codigos = 70.0;
    let ancho_barras = ancho_code128(&comprobante.clave_acceso)?;
    operaciones.extend(operaciones_code128(
        &comprobante.clave_acceso,
        MARGEN,
        base_codigos,
        42.0,
    )?);
    operaciones.extend(texto(
        "F1",
        6.5,
        MARGEN,
        base_codigos - 10.0,
        &comprobante.clave_acceso,
    ));

    let (ops_qr, _lado_qr) = operaciones_qr(
        &comprobante.clave_acceso,
        (MARGEN + ancho_barras + 30.0).min(ANCHO_PAGINA - 110.0),
        base_codigos - 12.0,
    )?;
    operaciones.extend(ops_qr);

    // --- ENSAMBLADO FINAL DEL DOCUMENTO ---
    let bytes = ensamblar_pdf(operaciones)?;
    debug!("📄 [RIDE]: Document assembled ({} bytes).", bytes.len());
    Ok(bytes)
}

fn ensamblar_pdf(operaciones: Vec<Operation>) -> Result<Vec<u8>, RideError> {
    let mut documento = Document::with_version("1.5");

    let pages_id = documento.new_object_id();

    let fuente_regular = documento.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let fuente_negrita = documento.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });

    let recursos = documento.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => fuente_regular,
            "F2" => fuente_negrita,
        },
    });

    let contenido = Content { operations: operaciones };
    let contenido_codificado = contenido
        .encode()
        .map_err(|fallo| RideError::Pdf(fallo.to_string()))?;
    let contenido_id = documento.add_object(Stream::new(dictionary! {}, contenido_codificado));

    let pagina_id = documento.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => contenido_id,
    });

    let paginas = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![pagina_id.into()],
        "Count" => 1,
        "Resources" => recursos,
        "MediaBox" => vec![
            0.into(),
            0.into(),
            ANCHO_PAGINA.into(),
            ALTO_PAGINA.into(),
        ],
    };
    documento
        .objects
        .insert(pages_id, Object::Dictionary(paginas));

    let catalogo_id = documento.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    documento.trailer.set("Root", catalogo_id);

    let mut bytes = Vec::new();
    documento
        .save_to(&mut bytes)
        .map_err(|fallo| RideError::Pdf(fallo.to_string()))?;
    Ok(bytes)
}

fn linea_horizontal(y: f64) -> Vec<Operation> {
    vec![
        Operation::new("RG", vec![0.into(), 0.into(), 0.into()]),
        Operation::new("w", vec![0.7.into()]),
        Operation::new("m", vec![MARGEN.into(), y.into()]),
        Operation::new("l", vec![(ANCHO_PAGINA - MARGEN).into(), y.into()]),
        Operation::new("S", vec![]),
    ]
}

fn recortar(texto_crudo: &str, maximo: usize) -> String {
    if texto_crudo.chars().count() <= maximo {
        texto_crudo.to_string()
    } else {
        let recortado: String = texto_crudo.chars().take(maximo.saturating_sub(3)).collect();
        format!("{}...", recortado)
    }
}

/// Catálogo SRI de formas de pago para la leyenda del RIDE.
fn nombre_forma_pago(codigo: &str) -> &'static str {
    match codigo {
        "01" => "SIN UTILIZACIÓN DEL SISTEMA FINANCIERO",
        "15" => "COMPENSACIÓN DE DEUDAS",
        "16" => "TARJETA DE DÉBITO",
        "17" => "DINERO ELECTRÓNICO",
        "18" => "TARJETA PREPAGO",
        "19" => "TARJETA DE CRÉDITO",
        "20" => "OTROS CON UTILIZACIÓN DEL SISTEMA FINANCIERO",
        "21" => "ENDOSO DE TÍTULOS",
        _ => "OTROS",
    }
}

// [libs/domain/ride/src/codigos.rs]
/*!
 * =================================================================
 * APARATO: SIMBOLOGÍAS DEL RIDE (V2.1 - VECTOR PURO)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: PROYECCIÓN DE LA CLAVE A CODE128 Y QR VECTORIALES
 *
 * Las simbologías se dibujan como rectángulos del flujo de contenido
 * PDF; no hay rasterización ni dependencias de imagen.
 * =================================================================
 */

use barcoders::sym::code128::Code128;
use lopdf::content::Operation;
use lopdf::Object;
use qrcode::{Color, QrCode};

use crate::RideError;

/// Ancho nominal de un módulo de barra (puntos PDF).
const ANCHO_MODULO_BARRA: f64 = 0.45;
/// Lado de un módulo QR (puntos PDF).
const LADO_MODULO_QR: f64 = 1.6;

/**
 * Emite las operaciones de dibujo del Code128 de la clave de acceso.
 *
 * # Logic:
 * La clave es decimal pura, por lo que se codifica en el juego de
 * caracteres A (selector 'À' de barcoders). El vector resultante es
 * una máscara de módulos 1/0 que se proyecta a rectángulos rellenos.
 *
 * # Errors:
 * - `CodigoBarras` si la simbología rechaza la carga útil.
 */
pub fn operaciones_code128(
    clave_acceso: &str,
    origen_x: f64,
    origen_y: f64,
    alto: f64,
) -> Result<Vec<Operation>, RideError> {
    let simbologia = Code128::new(format!("\u{00C0}{}", clave_acceso))
        .map_err(|fallo| RideError::CodigoBarras(format!("{:?}", fallo)))?;

    let modulos = simbologia.encode();

    let mut operaciones = vec![Operation::new("rg", vec![0.into(), 0.into(), 0.into()])];

    let mut cursor_x = origen_x;
    for modulo in modulos {
        if modulo == 1 {
            operaciones.push(Operation::new(
                "re",
                vec![
                    cursor_x.into(),
                    origen_y.into(),
                    ANCHO_MODULO_BARRA.into(),
                    alto.into(),
                ],
            ));
            operaciones.push(Operation::new("f", vec![]));
        }
        cursor_x += ANCHO_MODULO_BARRA;
    }

    Ok(operaciones)
}

/// Ancho total en puntos del Code128 de una clave de 49 dígitos.
pub fn ancho_code128(clave_acceso: &str) -> Result<f64, RideError> {
    let simbologia = Code128::new(format!("\u{00C0}{}", clave_acceso))
        .map_err(|fallo| RideError::CodigoBarras(format!("{:?}", fallo)))?;
    Ok(simbologia.encode().len() as f64 * ANCHO_MODULO_BARRA)
}

/**
 * Emite las operaciones de dibujo del QR de la clave de acceso.
 *
 * # Errors:
 * - `CodigoQr` si la carga útil excede la capacidad de la matriz.
 */
pub fn operaciones_qr(
    clave_acceso: &str,
    origen_x: f64,
    origen_y: f64,
) -> Result<(Vec<Operation>, f64), RideError> {
    let codigo = QrCode::new(clave_acceso.as_bytes())
        .map_err(|fallo| RideError::CodigoQr(fallo.to_string()))?;

    let ancho_modulos = codigo.width();
    let colores = codigo.to_colors();
    let lado_total = ancho_modulos as f64 * LADO_MODULO_QR;

    let mut operaciones = vec![Operation::new("rg", vec![0.into(), 0.into(), 0.into()])];

    for (indice, color) in colores.iter().enumerate() {
        if *color == Color::Dark {
            let columna = indice % ancho_modulos;
            let fila = indice / ancho_modulos;

            // El origen PDF está abajo-izquierda; la matriz QR arriba-izquierda.
            let x = origen_x + columna as f64 * LADO_MODULO_QR;
            let y = origen_y + lado_total - (fila as f64 + 1.0) * LADO_MODULO_QR;

            operaciones.push(Operation::new(
                "re",
                vec![
                    x.into(),
                    y.into(),
                    LADO_MODULO_QR.into(),
                    LADO_MODULO_QR.into(),
                ],
            ));
            operaciones.push(Operation::new("f", vec![]));
        }
    }

    Ok((operaciones, lado_total))
}

/// Proyección de texto a Latin-1 para las fuentes estándar del PDF.
pub fn a_latin1(texto: &str) -> Vec<u8> {
    texto
        .chars()
        .map(|caracter| {
            let punto = caracter as u32;
            if punto <= 0xFF {
                punto as u8
            } else {
                b'?'
            }
        })
        .collect()
}

/// Operación de texto posicionado con la fuente indicada.
pub fn texto(fuente: &str, tamano: f64, x: f64, y: f64, contenido: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(fuente.into()), tamano.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("Tj", vec![Object::String(
            a_latin1(contenido),
            lopdf::StringFormat::Literal,
        )]),
        Operation::new("ET", vec![]),
    ]
}

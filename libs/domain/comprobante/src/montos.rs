// [libs/domain/comprobante/src/montos.rs]
/*!
 * =================================================================
 * APARATO: ARITMÉTICA MONETARIA DEL COMPROBANTE (V2.3 - RECONCILIADOR)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: CUBETAS DE IMPUESTO Y RECONCILIACIÓN DE TOTALES
 *
 * # Mathematical Proof (Reconciliación):
 * importeTotal = Σ bases + Σ impuestos − descuento_total, donde el IVA
 * se calcula sobre (base gravada − descuento). La tolerancia legal entre
 * el total declarado por la venta y el reconstruido es de 0.01 USD; todo
 * descuadre superior aborta la construcción del comprobante.
 * =================================================================
 */

use rust_decimal::{Decimal, RoundingStrategy};

use crate::errors::BuilderError;
use factel_domain_models::VentaView;

/// Tolerancia máxima de descuadre entre el total declarado y el reconstruido.
pub const TOLERANCIA_DESCUADRE: &str = "0.01";

/// Proyecta un monto a dos decimales con redondeo mitad-lejos-de-cero
/// (el redondeo bancario está prohibido en los comprobantes SRI).
pub fn monto2(valor: Decimal) -> String {
    format!(
        "{:.2}",
        valor.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

/// Mapeo data-driven de la tarifa vigente al `codigoPorcentaje` oficial.
/// La tarifa 14% ("3") se conserva en el catálogo aunque esté en desuso.
pub fn codigo_porcentaje_iva(tarifa: Decimal) -> &'static str {
    if tarifa == Decimal::ZERO {
        "0"
    } else if tarifa == Decimal::from(14) {
        "3"
    } else {
        "2"
    }
}

/// Cubeta de impuesto agregada para el bloque `totalImpuesto`.
#[derive(Debug, Clone)]
pub struct CubetaImpuesto {
    pub codigo_porcentaje: &'static str,
    pub tarifa: Decimal,
    pub base_imponible: Decimal,
    pub valor: Decimal,
}

/// Resumen monetario reconciliado de la venta, listo para emisión.
#[derive(Debug, Clone)]
pub struct ResumenMontos {
    pub total_sin_impuestos: Decimal,
    pub total_descuento: Decimal,
    pub cubetas: Vec<CubetaImpuesto>,
    pub importe_total: Decimal,
}

impl ResumenMontos {
    /**
     * Construye las cubetas de impuesto y reconcilia los totales.
     *
     * # Logic:
     * - Cubeta gravada: base = subtotal_12 − descuento, IVA = base · tarifa.
     * - Cubeta cero: base = subtotal_0, valor 0.00 (solo si existe base).
     * - importeTotal = subtotal_12 + subtotal_0 + IVA − descuento.
     *
     * # Errors:
     * - `VentaInvalida` ante cifras negativas o venta sin líneas.
     * - `DescuadreMonetario` si |total declarado − reconstruido| > 0.01.
     */
    pub fn reconciliar(venta: &VentaView, iva_tarifa: Decimal) -> Result<Self, BuilderError> {
        if venta.detalles.is_empty() {
            return Err(BuilderError::VentaInvalida(
                "la venta no contiene líneas de detalle".to_string(),
            ));
        }

        for cifra in [venta.subtotal_12, venta.subtotal_0, venta.descuento, venta.total] {
            if cifra < Decimal::ZERO {
                return Err(BuilderError::VentaInvalida(format!(
                    "cifra monetaria negativa: {}",
                    cifra
                )));
            }
        }

        let redondear = |valor: Decimal| {
            valor.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        };

        let base_gravada = redondear(venta.subtotal_12 - venta.descuento);
        let iva = redondear(base_gravada * iva_tarifa / Decimal::from(100));

        let mut cubetas = Vec::new();
        if venta.subtotal_12 > Decimal::ZERO {
            cubetas.push(CubetaImpuesto {
                codigo_porcentaje: codigo_porcentaje_iva(iva_tarifa),
                tarifa: iva_tarifa,
                base_imponible: base_gravada,
                valor: iva,
            });
        }
        if venta.subtotal_0 > Decimal::ZERO {
            cubetas.push(CubetaImpuesto {
                codigo_porcentaje: "0",
                tarifa: Decimal::ZERO,
                base_imponible: redondear(venta.subtotal_0),
                valor: Decimal::ZERO,
            });
        }

        let total_sin_impuestos = redondear(venta.subtotal_12 + venta.subtotal_0);
        let importe_total =
            redondear(venta.subtotal_12 + venta.subtotal_0 + iva - venta.descuento);

        // Reconciliación contra las líneas: la suma de subtotales de línea
        // debe cuadrar con las bases declaradas en la cabecera.
        let suma_lineas: Decimal = venta.detalles.iter().map(|linea| linea.subtotal).sum();
        let reconstruido_desde_lineas = redondear(suma_lineas + iva - venta.descuento);

        let tolerancia: Decimal = TOLERANCIA_DESCUADRE.parse().unwrap_or(Decimal::ZERO);

        if (importe_total - reconstruido_desde_lineas).abs() > tolerancia {
            return Err(BuilderError::DescuadreMonetario {
                declarado: monto2(importe_total),
                reconstruido: monto2(reconstruido_desde_lineas),
            });
        }

        if (redondear(venta.total) - importe_total).abs() > tolerancia {
            return Err(BuilderError::DescuadreMonetario {
                declarado: monto2(venta.total),
                reconstruido: monto2(importe_total),
            });
        }

        Ok(Self {
            total_sin_impuestos,
            total_descuento: redondear(venta.descuento),
            cubetas,
            importe_total,
        })
    }
}

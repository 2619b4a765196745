// [libs/domain/models/src/venta.rs]
/*!
 * =================================================================
 * APARATO: VISTA DE VENTA (V2.2 - CONTRATO DE LECTURA)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATO DE SOLO LECTURA HACIA EL MODELO DE VENTAS
 *
 * El pipeline jamás escribe sobre la venta: consume este snapshot
 * serializable y lo persiste junto al comprobante para permitir el
 * reprocesamiento sin volver a tocar el esquema de ventas.
 * =================================================================
 */

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identificación del comprador según el catálogo SRI.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TipoIdentificacion {
    Ruc,
    Cedula,
    Pasaporte,
    ConsumidorFinal,
}

impl TipoIdentificacion {
    /// Código del campo `tipoIdentificacionComprador`.
    pub fn codigo_sri(&self) -> &'static str {
        match self {
            Self::Ruc => "04",
            Self::Cedula => "05",
            Self::Pasaporte => "06",
            Self::ConsumidorFinal => "07",
        }
    }
}

/// Una línea de detalle de la venta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineaVenta {
    /// Código principal del producto.
    pub codigo: String,
    pub descripcion: String,
    pub cantidad: Decimal,
    pub precio_unitario: Decimal,
    /// Descuento absoluto aplicado a la línea.
    pub descuento: Decimal,
    /// Subtotal de la línea sin impuestos (cantidad × precio − descuento).
    pub subtotal: Decimal,
}

/// Snapshot inmutable de la venta consumido por el constructor de XML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VentaView {
    pub comprador_nombre: String,
    pub comprador_identificacion: String,
    pub comprador_tipo_identificacion: TipoIdentificacion,
    pub comprador_direccion: Option<String>,
    pub comprador_telefono: Option<String>,
    pub comprador_email: Option<String>,

    /// Base gravada con la tarifa vigente de IVA.
    pub subtotal_12: Decimal,
    /// Base con tarifa cero.
    pub subtotal_0: Decimal,
    pub descuento: Decimal,
    pub iva: Decimal,
    pub total: Decimal,

    /// Código SRI de la forma de pago ("01" efectivo, "20" tarjeta, etc.).
    pub forma_pago: String,

    pub fecha_emision: NaiveDate,

    pub detalles: Vec<LineaVenta>,
}

impl VentaView {
    /// Identidad efectiva del comprador con el retroceso de consumidor final.
    pub fn identificacion_efectiva(&self) -> &str {
        if self.comprador_identificacion.is_empty() {
            "9999999999"
        } else {
            &self.comprador_identificacion
        }
    }

    /// Venta anónima de mostrador: consumidor final sin identidad.
    pub fn consumidor_final_anonimo(
        fecha_emision: NaiveDate,
        detalles: Vec<LineaVenta>,
        subtotal_12: Decimal,
        subtotal_0: Decimal,
        descuento: Decimal,
        iva: Decimal,
        total: Decimal,
    ) -> Self {
        Self {
            comprador_nombre: "CONSUMIDOR FINAL".to_string(),
            comprador_identificacion: "9999999999".to_string(),
            comprador_tipo_identificacion: TipoIdentificacion::ConsumidorFinal,
            comprador_direccion: None,
            comprador_telefono: None,
            comprador_email: None,
            subtotal_12,
            subtotal_0,
            descuento,
            iva,
            total,
            forma_pago: "01".to_string(),
            fecha_emision,
            detalles,
        }
    }
}

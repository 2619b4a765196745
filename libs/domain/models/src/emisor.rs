// [libs/domain/models/src/emisor.rs]
/*!
 * =================================================================
 * APARATO: CONFIGURACIÓN DEL EMISOR (V2.0 - SOBERANO)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: SNAPSHOT DE LA IDENTIDAD TRIBUTARIA DEL EMISOR
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CONTEXT OBJECT: El emisor viaja como objeto de contexto explícito
 *    por todo el pipeline; no existen singletons de configuración.
 * 2. ROW SOVEREIGNTY: La fila única de persistencia se escribe solo por
 *    la ruta administrativa con bloqueo exclusivo (Estrato L3).
 * =================================================================
 */

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Clasificación del contribuyente para el bloque `tipoProveedor`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TipoContribuyente {
    /// Persona jurídica ("01").
    Sociedad,
    /// Persona natural ("02").
    PersonaNatural,
}

impl TipoContribuyente {
    pub fn codigo(&self) -> &'static str {
        match self {
            Self::Sociedad => "01",
            Self::PersonaNatural => "02",
        }
    }
}

/// Identidad tributaria completa del emisor, sostenida por el orquestador
/// durante la vida de una corrida del pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfiguracionEmisor {
    /// RUC del emisor (13 dígitos).
    pub ruc: String,

    pub razon_social: String,
    pub nombre_comercial: Option<String>,

    /// Dirección de la matriz (campo `dirMatriz`).
    pub direccion_matriz: String,
    /// Dirección de la sucursal emisora (campo `dirEstablecimiento`).
    pub direccion_sucursal: Option<String>,

    pub telefono: Option<String>,
    pub email: Option<String>,

    /// Código de establecimiento (3 dígitos).
    pub establecimiento: String,
    /// Código de punto de emisión (3 dígitos).
    pub punto_emision: String,

    /// Tarifa de IVA vigente en porcentaje (12.00, 14.00, 0.00).
    pub iva_tarifa: Decimal,

    pub obligado_contabilidad: bool,
    pub contribuyente_especial: bool,
    /// Número de resolución cuando el emisor es contribuyente especial.
    pub resolucion_contribuyente: Option<String>,
    pub tipo_contribuyente: TipoContribuyente,

    /// Ruta física al certificado PKCS#12 (.p12).
    pub certificado_path: String,
    pub certificado_password: String,

    /// "1" pruebas, "2" producción.
    pub ambiente: String,
    /// "1" normal, "2" contingencia.
    pub tipo_emision: String,

    /// Plantilla del asunto del correo de comprobantes.
    pub email_asunto_plantilla: String,
}

impl ConfiguracionEmisor {
    /// Nombre comercial con retroceso a la razón social, como exige el XML.
    pub fn nombre_comercial_efectivo(&self) -> &str {
        self.nombre_comercial
            .as_deref()
            .filter(|nombre| !nombre.is_empty())
            .unwrap_or(&self.razon_social)
    }

    /// Dirección del establecimiento con retroceso a la matriz.
    pub fn direccion_establecimiento_efectiva(&self) -> &str {
        self.direccion_sucursal
            .as_deref()
            .filter(|direccion| !direccion.is_empty())
            .unwrap_or(&self.direccion_matriz)
    }
}

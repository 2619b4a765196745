// [libs/domain/models/src/comprobante.rs]
/*!
 * =================================================================
 * APARATO: COMPROBANTE AGGREGATE (V3.1 - STATE GUARD)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: ENTIDAD CENTRAL DEL PIPELINE Y SU MÁQUINA DE ESTADOS
 *
 * # Mathematical Proof (Monotonic Lifecycle):
 * El grafo de transiciones es acíclico y toda arista avanza hacia un
 * estado terminal. Al validar cada transición contra el grafo antes de
 * mutar, se garantiza que un comprobante jamás retrocede y que los
 * estados terminales (Autorizado, Devuelto, Fallido) son absorbentes.
 * =================================================================
 */

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::mensajes::MensajeSri;

/// Techo legal del secuencial SRI (9 dígitos).
pub const SECUENCIAL_MAXIMO: u32 = 999_999_999;

#[derive(Error, Debug)]
pub enum ModelError {
    /// Intento de avanzar desde un estado terminal o saltarse una arista del grafo.
    #[error("[L2_ESTADO_FAULT]: TRANSICION_ILEGAL -> {desde} => {hacia}")]
    TransicionIlegal { desde: String, hacia: String },

    /// Código de tipo de comprobante fuera del catálogo oficial.
    #[error("[L2_TIPO_FAULT]: TIPO_COMPROBANTE_DESCONOCIDO -> {0}")]
    TipoDesconocido(String),

    /// Secuencial fuera del rango legal [1, 999999999].
    #[error("[L2_SECUENCIA_FAULT]: SECUENCIAL_FUERA_DE_RANGO -> {0}")]
    SecuencialFueraDeRango(u32),
}

/// Catálogo oficial de comprobantes electrónicos del SRI.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TipoComprobante {
    /// Factura ("01").
    Factura,
    /// Nota de crédito ("04").
    NotaCredito,
    /// Nota de débito ("05").
    NotaDebito,
    /// Guía de remisión ("06").
    GuiaRemision,
    /// Comprobante de retención ("07").
    Retencion,
}

impl TipoComprobante {
    pub fn codigo(&self) -> &'static str {
        match self {
            Self::Factura => "01",
            Self::NotaCredito => "04",
            Self::NotaDebito => "05",
            Self::GuiaRemision => "06",
            Self::Retencion => "07",
        }
    }

    pub fn desde_codigo(codigo: &str) -> Result<Self, ModelError> {
        match codigo {
            "01" => Ok(Self::Factura),
            "04" => Ok(Self::NotaCredito),
            "05" => Ok(Self::NotaDebito),
            "06" => Ok(Self::GuiaRemision),
            "07" => Ok(Self::Retencion),
            otro => Err(ModelError::TipoDesconocido(otro.to_string())),
        }
    }

    /// Elemento raíz del XML correspondiente al tipo.
    pub fn elemento_raiz(&self) -> &'static str {
        match self {
            Self::Factura => "factura",
            Self::NotaCredito => "notaCredito",
            Self::NotaDebito => "notaDebito",
            Self::GuiaRemision => "guiaRemision",
            Self::Retencion => "comprobanteRetencion",
        }
    }
}

/// Ambiente de trabajo declarado ante el SRI.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Ambiente {
    /// Pruebas ("1"): celcer.sri.gob.ec.
    Pruebas,
    /// Producción ("2"): cel.sri.gob.ec.
    Produccion,
}

impl Ambiente {
    pub fn codigo(&self) -> &'static str {
        match self {
            Self::Pruebas => "1",
            Self::Produccion => "2",
        }
    }

    pub fn desde_codigo(codigo: &str) -> Self {
        if codigo == "2" {
            Self::Produccion
        } else {
            Self::Pruebas
        }
    }
}

/// Modalidad de emisión del comprobante.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TipoEmision {
    /// Emisión normal ("1").
    Normal,
    /// Emisión por contingencia ("2").
    Contingencia,
}

impl TipoEmision {
    pub fn codigo(&self) -> &'static str {
        match self {
            Self::Normal => "1",
            Self::Contingencia => "2",
        }
    }
}

/// Estados del ciclo de vida de un comprobante en el pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EstadoComprobante {
    Pendiente,
    XmlGenerado,
    Validado,
    Firmado,
    Recibido,
    Autorizado,
    Devuelto,
    Fallido,
}

impl EstadoComprobante {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pendiente => "PENDIENTE",
            Self::XmlGenerado => "XML_GENERADO",
            Self::Validado => "VALIDADO",
            Self::Firmado => "FIRMADO",
            Self::Recibido => "RECIBIDO",
            Self::Autorizado => "AUTORIZADO",
            Self::Devuelto => "DEVUELTO",
            Self::Fallido => "FALLIDO",
        }
    }

    pub fn desde_str(etiqueta: &str) -> Self {
        match etiqueta {
            "XML_GENERADO" => Self::XmlGenerado,
            "VALIDADO" => Self::Validado,
            "FIRMADO" => Self::Firmado,
            "RECIBIDO" => Self::Recibido,
            "AUTORIZADO" => Self::Autorizado,
            "DEVUELTO" => Self::Devuelto,
            "FALLIDO" => Self::Fallido,
            _ => Self::Pendiente,
        }
    }

    /// Un estado terminal es absorbente: el comprobante queda sellado.
    pub fn es_terminal(&self) -> bool {
        matches!(self, Self::Autorizado | Self::Devuelto | Self::Fallido)
    }

    /**
     * Evalúa la legalidad de una arista del grafo de estados.
     *
     * # Logic:
     * Cualquier estado no terminal puede colapsar a Fallido. Las aristas
     * de avance siguen estrictamente la secuencia del pipeline; Recibido
     * bifurca hacia Autorizado o Devuelto según el veredicto del SRI.
     */
    pub fn permite_transicion_a(&self, destino: Self) -> bool {
        if self.es_terminal() {
            return false;
        }
        if destino == Self::Fallido {
            return true;
        }
        matches!(
            (self, destino),
            (Self::Pendiente, Self::XmlGenerado)
                | (Self::XmlGenerado, Self::Validado)
                | (Self::Validado, Self::Firmado)
                | (Self::Firmado, Self::Recibido)
                | (Self::Firmado, Self::Devuelto)
                | (Self::Recibido, Self::Autorizado)
                | (Self::Recibido, Self::Devuelto)
        )
    }
}

/// Entidad central del pipeline: un comprobante electrónico en tránsito
/// hacia su autorización. Registro de auditoría permanente, jamás se destruye.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comprobante {
    /// Identificador interno opaco (UUID v4).
    pub id: String,

    /// Referencia hacia la venta de origen.
    pub venta_ref: String,

    /// Tipo de comprobante del catálogo oficial.
    pub tipo: TipoComprobante,

    /// Código de establecimiento (3 dígitos).
    pub establecimiento: String,

    /// Código de punto de emisión (3 dígitos).
    pub punto_emision: String,

    /// Secuencial asignado por el estrato de persistencia [1, 999999999].
    pub secuencial: u32,

    /// Clave de acceso de 49 dígitos (vacía hasta la generación del XML).
    pub clave_acceso: String,

    /// Código numérico de entropía (8 dígitos) registrado para regeneración idempotente.
    pub codigo_numerico: String,

    pub ambiente: Ambiente,
    pub tipo_emision: TipoEmision,

    /// Fecha de emisión con granularidad de día.
    pub fecha_emision: NaiveDate,

    pub estado: EstadoComprobante,

    pub xml_generado: Option<String>,
    pub xml_firmado: Option<String>,
    pub xml_autorizado: Option<String>,

    pub numero_autorizacion: Option<String>,
    pub fecha_autorizacion: Option<String>,

    /// Rastro ordenado de mensajes del pipeline y del SRI.
    pub mensajes: Vec<MensajeSri>,

    pub created_at: String,
    pub updated_at: String,
}

impl Comprobante {
    /**
     * Crea un comprobante recién nacido en estado Pendiente.
     *
     * # Errors:
     * - `SecuencialFueraDeRango` si el secuencial viola el techo legal.
     */
    pub fn nuevo(
        venta_ref: &str,
        tipo: TipoComprobante,
        establecimiento: &str,
        punto_emision: &str,
        secuencial: u32,
        ambiente: Ambiente,
        tipo_emision: TipoEmision,
        fecha_emision: NaiveDate,
    ) -> Result<Self, ModelError> {
        if secuencial == 0 || secuencial > SECUENCIAL_MAXIMO {
            return Err(ModelError::SecuencialFueraDeRango(secuencial));
        }

        let marca_temporal = Utc::now().to_rfc3339();

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            venta_ref: venta_ref.to_string(),
            tipo,
            establecimiento: establecimiento.to_string(),
            punto_emision: punto_emision.to_string(),
            secuencial,
            clave_acceso: String::new(),
            codigo_numerico: String::new(),
            ambiente,
            tipo_emision,
            fecha_emision,
            estado: EstadoComprobante::Pendiente,
            xml_generado: None,
            xml_firmado: None,
            xml_autorizado: None,
            numero_autorizacion: None,
            fecha_autorizacion: None,
            mensajes: Vec::new(),
            created_at: marca_temporal.clone(),
            updated_at: marca_temporal,
        })
    }

    /// Número legible `EEE-PPP-SSSSSSSSS`, derivable siempre de la tripleta.
    pub fn numero_formateado(&self) -> String {
        format!(
            "{}-{}-{:09}",
            self.establecimiento, self.punto_emision, self.secuencial
        )
    }

    pub fn es_terminal(&self) -> bool {
        self.estado.es_terminal()
    }

    /**
     * Avanza el estado del comprobante validando el grafo soberano.
     *
     * # Errors:
     * - `TransicionIlegal` ante un intento de avance desde estado terminal
     *   o una arista inexistente en el grafo.
     */
    pub fn transicionar(&mut self, destino: EstadoComprobante) -> Result<(), ModelError> {
        if !self.estado.permite_transicion_a(destino) {
            return Err(ModelError::TransicionIlegal {
                desde: self.estado.as_str().to_string(),
                hacia: destino.as_str().to_string(),
            });
        }
        self.estado = destino;
        self.updated_at = Utc::now().to_rfc3339();
        Ok(())
    }

    /// Los mensajes observacionales se permiten incluso en estados terminales.
    pub fn agregar_mensaje(&mut self, mensaje: MensajeSri) {
        self.mensajes.push(mensaje);
        self.updated_at = Utc::now().to_rfc3339();
    }

    /// Certifica el invariante de autorización: clave, número, fecha y XML presentes.
    pub fn autorizacion_integra(&self) -> bool {
        self.estado == EstadoComprobante::Autorizado
            && self.clave_acceso.len() == 49
            && self.numero_autorizacion.as_deref().is_some_and(|n| !n.is_empty())
            && self.fecha_autorizacion.as_deref().is_some_and(|f| !f.is_empty())
            && self.xml_autorizado.as_deref().is_some_and(|x| !x.is_empty())
    }
}

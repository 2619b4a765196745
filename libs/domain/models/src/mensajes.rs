// [libs/domain/models/src/mensajes.rs]
/*!
 * =================================================================
 * APARATO: RASTRO DE MENSAJES DEL PIPELINE (V1.2 - SOBERANO)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: GRAMÁTICA INMUTABLE DE LOS MENSAJES SRI Y DEL PIPELINE
 * =================================================================
 */

use serde::{Deserialize, Serialize};

/// Clasificación semántica de la severidad del mensaje.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SeveridadMensaje {
    /// Observaciones del pipeline (PDF generado, email enviado).
    Informativo,
    /// Fallos no fatales (validación XSD en pruebas, PDF no generado).
    Advertencia,
    /// Rechazos del SRI o colapsos de etapa.
    Error,
}

/// Unidad atómica del rastro forense de un comprobante.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MensajeSri {
    pub severidad: SeveridadMensaje,

    /// Código estable del mensaje (identificador SRI o código interno).
    pub codigo: String,

    /// Texto humano del mensaje.
    pub texto: String,

    /// Información adicional estructurada (campo `informacionAdicional` del SRI).
    pub informacion_adicional: Option<String>,
}

impl MensajeSri {
    pub fn informativo(codigo: &str, texto: impl Into<String>) -> Self {
        Self {
            severidad: SeveridadMensaje::Informativo,
            codigo: codigo.to_string(),
            texto: texto.into(),
            informacion_adicional: None,
        }
    }

    pub fn advertencia(codigo: &str, texto: impl Into<String>) -> Self {
        Self {
            severidad: SeveridadMensaje::Advertencia,
            codigo: codigo.to_string(),
            texto: texto.into(),
            informacion_adicional: None,
        }
    }

    pub fn error(codigo: &str, texto: impl Into<String>) -> Self {
        Self {
            severidad: SeveridadMensaje::Error,
            codigo: codigo.to_string(),
            texto: texto.into(),
            informacion_adicional: None,
        }
    }

    pub fn con_detalle(mut self, detalle: impl Into<String>) -> Self {
        self.informacion_adicional = Some(detalle.into());
        self
    }
}

// [libs/infra/correo/src/lib.rs]
/*!
 * =================================================================
 * APARATO: DESPACHADOR DE COMPROBANTES POR CORREO (V3.1 - SOBERANO)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: ENVÍO MULTIPART CON XML Y RIDE ADJUNTOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. OBSERVATIONAL FAILURE: Un fallo de correo jamás degrada el estado
 *    del comprobante; el orquestador lo registra como mensaje.
 * 2. ENV-DRIVEN: Los parámetros SMTP viven fuera de banda (variables
 *    de entorno), nunca en el Ledger.
 * 3. NO AUTO-RETRY: Sin reintentos propios más allá del manejo de
 *    conexión del transporte SMTP subyacente.
 * =================================================================
 */

use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

#[derive(Error, Debug)]
pub enum CorreoError {
    /// Credenciales SMTP ausentes en el entorno.
    #[error("[L3_CORREO_FAULT]: SMTP_NO_CONFIGURADO")]
    NoConfigurado,

    /// Dirección de remitente o destinatario ilegible.
    #[error("[L3_CORREO_FAULT]: DIRECCION_INVALIDA -> {0}")]
    DireccionInvalida(String),

    /// Colapso en la construcción del mensaje multipart.
    #[error("[L3_CORREO_FAULT]: CONSTRUCCION_DEL_MENSAJE -> {0}")]
    Construccion(String),

    /// Fallo del transporte SMTP subyacente.
    #[error("[L3_CORREO_FAULT]: TRANSPORTE_SMTP -> {0}")]
    Transporte(#[from] lettre::transport::smtp::Error),
}

/// Parámetros SMTP leídos fuera de banda.
#[derive(Debug, Clone)]
pub struct ConfiguracionCorreo {
    pub host: String,
    pub puerto: u16,
    pub usuario: String,
    pub contrasena: String,
    pub usar_tls: bool,
    pub usar_ssl: bool,
    pub remitente: String,
    pub timeout: Duration,
}

impl ConfiguracionCorreo {
    /**
     * Hidrata la configuración desde las variables de entorno:
     * EMAIL_HOST, EMAIL_PORT, EMAIL_HOST_USER, EMAIL_HOST_PASSWORD,
     * EMAIL_USE_TLS, EMAIL_USE_SSL, EMAIL_DEFAULT_FROM, EMAIL_TIMEOUT.
     */
    pub fn desde_entorno() -> Self {
        let leer = |clave: &str, defecto: &str| {
            std::env::var(clave).unwrap_or_else(|_| defecto.to_string())
        };

        let usuario = leer("EMAIL_HOST_USER", "");

        Self {
            host: leer("EMAIL_HOST", "smtp.gmail.com"),
            puerto: leer("EMAIL_PORT", "587").parse().unwrap_or(587),
            contrasena: leer("EMAIL_HOST_PASSWORD", ""),
            usar_tls: leer("EMAIL_USE_TLS", "true") == "true",
            usar_ssl: leer("EMAIL_USE_SSL", "false") == "true",
            remitente: leer("EMAIL_DEFAULT_FROM", &usuario),
            timeout: Duration::from_secs(leer("EMAIL_TIMEOUT", "30").parse().unwrap_or(30)),
            usuario,
        }
    }

    pub fn esta_configurado(&self) -> bool {
        !self.usuario.is_empty() && !self.contrasena.is_empty()
    }
}

/// Datos contextuales del cuerpo del correo.
#[derive(Debug, Clone, Default)]
pub struct DatosCorreo {
    pub razon_social: String,
    pub cliente: String,
    pub total: String,
    pub fecha: String,
}

/// Gestor de envío de comprobantes electrónicos por correo.
pub struct DespachadorCorreo {
    configuracion: ConfiguracionCorreo,
}

impl DespachadorCorreo {
    pub fn new(configuracion: ConfiguracionCorreo) -> Self {
        Self { configuracion }
    }

    fn construir_transporte(&self) -> Result<SmtpTransport, CorreoError> {
        if !self.configuracion.esta_configurado() {
            return Err(CorreoError::NoConfigurado);
        }

        let credenciales = Credentials::new(
            self.configuracion.usuario.clone(),
            self.configuracion.contrasena.clone(),
        );

        let constructor = if self.configuracion.usar_ssl {
            SmtpTransport::relay(&self.configuracion.host)?
        } else if self.configuracion.usar_tls {
            SmtpTransport::starttls_relay(&self.configuracion.host)?
        } else {
            SmtpTransport::builder_dangerous(&self.configuracion.host)
        };

        Ok(constructor
            .port(self.configuracion.puerto)
            .credentials(credenciales)
            .timeout(Some(self.configuracion.timeout))
            .build())
    }

    /// Sonda de conexión contra el servidor SMTP configurado.
    pub fn verificar_conexion(&self) -> bool {
        match self.construir_transporte() {
            Ok(transporte) => transporte.test_connection().unwrap_or(false),
            Err(fallo) => {
                error!("⚠️ [CORREO]: Connection probe failed: {}", fallo);
                false
            }
        }
    }

    /**
     * Envía el comprobante autorizado al comprador.
     *
     * # Logic:
     * Mensaje multipart: cuerpo plano + `<numero>.xml` + `<numero>.pdf`
     * (el PDF es opcional si el RIDE no pudo generarse).
     *
     * # Errors:
     * - `NoConfigurado` / `DireccionInvalida` / `Transporte`.
     */
    #[instrument(skip(self, xml_autorizado, pdf_ride, datos))]
    pub fn enviar_comprobante(
        &self,
        destinatario: &str,
        numero_comprobante: &str,
        xml_autorizado: &[u8],
        pdf_ride: Option<&[u8]>,
        datos: &DatosCorreo,
        asunto_plantilla: &str,
    ) -> Result<(), CorreoError> {
        let transporte = self.construir_transporte()?;

        let remitente: Mailbox = self
            .configuracion
            .remitente
            .parse()
            .map_err(|_| CorreoError::DireccionInvalida(self.configuracion.remitente.clone()))?;

        let destino: Mailbox = destinatario
            .parse()
            .map_err(|_| CorreoError::DireccionInvalida(destinatario.to_string()))?;

        let asunto = asunto_plantilla.replace("{numero}", numero_comprobante);
        let cuerpo = generar_cuerpo(numero_comprobante, datos);

        let tipo_xml = ContentType::parse("application/xml")
            .map_err(|fallo| CorreoError::Construccion(fallo.to_string()))?;

        let mut contenido = MultiPart::mixed()
            .singlepart(SinglePart::plain(cuerpo))
            .singlepart(
                Attachment::new(format!("{}.xml", numero_comprobante))
                    .body(xml_autorizado.to_vec(), tipo_xml),
            );

        if let Some(pdf) = pdf_ride {
            let tipo_pdf = ContentType::parse("application/pdf")
                .map_err(|fallo| CorreoError::Construccion(fallo.to_string()))?;
            contenido = contenido.singlepart(
                Attachment::new(format!("{}.pdf", numero_comprobante))
                    .body(pdf.to_vec(), tipo_pdf),
            );
        }

        let mensaje = Message::builder()
            .from(remitente)
            .to(destino)
            .subject(asunto)
            .multipart(contenido)
            .map_err(|fallo| CorreoError::Construccion(fallo.to_string()))?;

        transporte.send(&mensaje)?;

        info!("📧 [CORREO]: Comprobante [{}] dispatched to [{}].", numero_comprobante, destinatario);
        Ok(())
    }

    /// Envío de prueba para certificar la configuración SMTP.
    pub fn enviar_prueba(&self, destinatario: &str) -> Result<(), CorreoError> {
        let transporte = self.construir_transporte()?;

        let remitente: Mailbox = self
            .configuracion
            .remitente
            .parse()
            .map_err(|_| CorreoError::DireccionInvalida(self.configuracion.remitente.clone()))?;

        let destino: Mailbox = destinatario
            .parse()
            .map_err(|_| CorreoError::DireccionInvalida(destinatario.to_string()))?;

        let mensaje = Message::builder()
            .from(remitente)
            .to(destino)
            .subject("Prueba de configuración - Facturación Electrónica")
            .body("Esta es una prueba de configuración del sistema de facturación electrónica.".to_string())
            .map_err(|fallo| CorreoError::Construccion(fallo.to_string()))?;

        transporte.send(&mensaje)?;

        warn!("📨 [CORREO]: Test message dispatched to [{}].", destinatario);
        Ok(())
    }
}

fn generar_cuerpo(numero_comprobante: &str, datos: &DatosCorreo) -> String {
    format!(
        "Estimado/a cliente,\n\n\
         Se le hace llegar su comprobante electrónico.\n\n\
         DATOS DEL COMPROBANTE:\n\
         - Número: {numero}\n\
         - Fecha: {fecha}\n\
         - Cliente: {cliente}\n\
         - Total: ${total}\n\n\
         Este comprobante ha sido autorizado por el SRI.\n\n\
         Archivos adjuntos:\n\
         - Comprobante electrónico en formato XML\n\
         - Representación impresa (PDF)\n\n\
         Por favor conserve este documento para sus registros.\n\n\
         Saludos cordiales,\n\
         {razon_social}\n\n\
         ---\n\
         Este es un correo automático, por favor no responder directamente.",
        numero = numero_comprobante,
        fecha = datos.fecha,
        cliente = datos.cliente,
        total = datos.total,
        razon_social = datos.razon_social,
    )
}

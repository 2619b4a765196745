// [apps/pipeline/src/bootstrap.rs]
/*!
 * =================================================================
 * APARATO: BOOTSTRAP DEL PIPELINE (V4.1 - CONTEXT OBJECT)
 * CLASIFICACIÓN: APPLICATION LAYER (ESTRATO L1-APP)
 * RESPONSABILIDAD: HIDRATACIÓN DEL CONTEXTO DESDE EL ENTORNO Y EL LEDGER
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. NO SINGLETONS: Toda la configuración viaja como objeto de contexto
 *    explícito; el proceso no alberga estado global de configuración.
 * 2. SHARED STATELESS: Validador XSD y cliente SOAP se comparten entre
 *    corridas vía Arc una vez construidos.
 * =================================================================
 */

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::info;

use factel_domain_models::{ConfiguracionEmisor, TipoContribuyente};
use factel_infra_correo::{ConfiguracionCorreo, DespachadorCorreo};
use factel_infra_db::{ComprobanteRepository, EmisorRepository, LedgerClient, SecuencialRepository};
use factel_infra_sri_ws::{PoliticaReintentos, PoliticaSondeo, SriWsClient};
use factel_infra_xsd::ValidadorXsd;

use crate::procesador::{OpcionesProcesamiento, ProcesadorComprobante};

fn variable(clave: &str, defecto: &str) -> String {
    std::env::var(clave).unwrap_or_else(|_| defecto.to_string())
}

fn variable_opcional(clave: &str) -> Option<String> {
    std::env::var(clave).ok().filter(|valor| !valor.is_empty())
}

/// Contexto maestro del pipeline: ledger, identidad del emisor y
/// adaptadores compartidos.
pub struct ContextoAplicacion {
    pub ledger: LedgerClient,
    pub emisor: ConfiguracionEmisor,
    pub comprobantes: Arc<ComprobanteRepository>,
    pub secuencias: Arc<SecuencialRepository>,
    pub validador: Arc<ValidadorXsd>,
    pub transporte: Arc<SriWsClient>,
    pub correo: Option<Arc<DespachadorCorreo>>,
    pub opciones: OpcionesProcesamiento,
}

impl ContextoAplicacion {
    /**
     * Hidrata el contexto completo: enlace al Ledger, fila del emisor,
     * esquemas XSD, uplink SRI y despachador SMTP.
     *
     * # Errors:
     * Falla si el Ledger es inalcanzable o la fila del emisor no fue
     * sembrada (ejecutar el binario `seed` primero).
     */
    pub async fn inicializar() -> Result<Self> {
        let database_url = variable("DATABASE_URL", "file:factel.db");
        let database_token = variable_opcional("DATABASE_AUTH_TOKEN");

        let ledger = LedgerClient::connect(&database_url, database_token)
            .await
            .context("BOOT_FAULT: enlace al Ledger Tributario rechazado")?;

        let emisor = EmisorRepository::new(ledger.clone())
            .cargar()
            .await
            .context("BOOT_FAULT: configuración del emisor ausente (ejecutar `seed`)")?;

        let validador = Arc::new(ValidadorXsd::new(&PathBuf::from(variable("XSD_DIR", "xsd"))));

        let reintentos = PoliticaReintentos {
            timeout: Duration::from_secs(
                variable("SRI_TIMEOUT_SEGUNDOS", "60").parse().unwrap_or(60),
            ),
            intentos_maximos: variable("SRI_REINTENTOS", "3").parse().unwrap_or(3),
            base_backoff: Duration::from_secs(
                variable("SRI_BACKOFF_SEGUNDOS", "2").parse().unwrap_or(2),
            ),
        };

        let transporte = Arc::new(SriWsClient::new(
            &emisor.ambiente,
            reintentos,
            PoliticaSondeo::default(),
        ));

        let configuracion_correo = ConfiguracionCorreo::desde_entorno();
        let correo = if configuracion_correo.esta_configurado() {
            Some(Arc::new(DespachadorCorreo::new(configuracion_correo)))
        } else {
            info!("📭 [BOOT]: SMTP sin configurar; el despacho de correo queda inactivo.");
            None
        };

        let opciones = OpcionesProcesamiento {
            firmar: variable("PIPELINE_FIRMAR", "true") == "true",
            enviar_sri: variable("PIPELINE_ENVIAR_SRI", "true") == "true",
            enviar_correo: variable("PIPELINE_ENVIAR_EMAIL", "true") == "true",
            plazo_maximo: variable_opcional("PIPELINE_PLAZO_SEGUNDOS")
                .and_then(|valor| valor.parse().ok())
                .map(Duration::from_secs),
            directorio_pdf: variable_opcional("PIPELINE_PDF_DIR").map(PathBuf::from),
        };

        info!(
            "🚀 [BOOT]: Context level. RUC [{}], ambiente [{}].",
            emisor.ruc, emisor.ambiente
        );

        Ok(Self {
            comprobantes: Arc::new(ComprobanteRepository::new(ledger.clone())),
            secuencias: Arc::new(SecuencialRepository::new(ledger.clone())),
            ledger,
            emisor,
            validador,
            transporte,
            correo,
            opciones,
        })
    }

    /// Ensambla el procesador con los adaptadores del contexto.
    pub fn procesador(&self) -> ProcesadorComprobante<SriWsClient> {
        ProcesadorComprobante::new(
            self.emisor.clone(),
            Arc::clone(&self.comprobantes),
            Arc::clone(&self.secuencias),
            Arc::clone(&self.validador),
            Arc::clone(&self.transporte),
            self.correo.clone(),
            self.opciones.clone(),
        )
    }
}

/**
 * Hidrata la identidad tributaria del emisor desde el entorno (usada
 * por el binario `seed` para sembrar la fila única).
 */
pub fn emisor_desde_entorno() -> ConfiguracionEmisor {
    let tipo_contribuyente = if variable("EMISOR_TIPO_CONTRIBUYENTE", "sociedad") == "sociedad" {
        TipoContribuyente::Sociedad
    } else {
        TipoContribuyente::PersonaNatural
    };

    ConfiguracionEmisor {
        ruc: variable("EMISOR_RUC", ""),
        razon_social: variable("EMISOR_RAZON_SOCIAL", ""),
        nombre_comercial: variable_opcional("EMISOR_NOMBRE_COMERCIAL"),
        direccion_matriz: variable("EMISOR_DIRECCION_MATRIZ", ""),
        direccion_sucursal: variable_opcional("EMISOR_DIRECCION_SUCURSAL"),
        telefono: variable_opcional("EMISOR_TELEFONO"),
        email: variable_opcional("EMISOR_EMAIL"),
        establecimiento: variable("EMISOR_ESTABLECIMIENTO", "001"),
        punto_emision: variable("EMISOR_PUNTO_EMISION", "001"),
        iva_tarifa: variable("EMISOR_IVA_TARIFA", "12")
            .parse::<Decimal>()
            .unwrap_or_else(|_| Decimal::from(12)),
        obligado_contabilidad: variable("EMISOR_OBLIGADO_CONTABILIDAD", "false") == "true",
        contribuyente_especial: variable("EMISOR_CONTRIBUYENTE_ESPECIAL", "false") == "true",
        resolucion_contribuyente: variable_opcional("EMISOR_RESOLUCION"),
        tipo_contribuyente,
        certificado_path: variable("CERTIFICADO_PATH", "certificado.p12"),
        certificado_password: variable("CERTIFICADO_PASSWORD", ""),
        ambiente: variable("SRI_AMBIENTE", "1"),
        tipo_emision: variable("SRI_TIPO_EMISION", "1"),
        email_asunto_plantilla: variable(
            "EMAIL_ASUNTO_PLANTILLA",
            "Comprobante Electrónico - Factura {numero}",
        ),
    }
}

// [libs/infra/firma/src/certificado.rs]
/*!
 * =================================================================
 * APARATO: GESTOR DE CREDENCIALES PKCS#12 (V4.1 - SCOPED RESOURCE)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: CARGA Y VALIDACIÓN DEL CERTIFICADO DEL EMISOR
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SCOPED LIFETIME: La credencial se carga por corrida del pipeline y
 *    se libera al salir del alcance; jamás se comparte mutablemente.
 * 2. EXPIRY GUARD: El notAfter se verifica en la carga, ANTES de
 *    cualquier contacto con el SRI.
 * =================================================================
 */

use std::cmp::Ordering;
use std::path::Path;

use openssl::asn1::Asn1Time;
use openssl::nid::Nid;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use tracing::{info, instrument};

use crate::errors::FirmaError;

/// Introspección del certificado cargado (observabilidad administrativa).
#[derive(Debug, Clone)]
pub struct InfoCertificado {
    pub sujeto: String,
    pub emisor: String,
    pub not_after: String,
}

/// Credencial de firma extraída del contenedor PKCS#12.
/// Recurso de alcance: se libera en todo camino de salida.
pub struct Certificado {
    clave_privada: PKey<Private>,
    certificado_hoja: X509,
    cadena: Vec<X509>,
}

impl Certificado {
    /**
     * Carga y valida la credencial desde el archivo .p12.
     *
     * # Logic:
     * 1. Lectura física del contenedor.
     * 2. Descifrado PKCS#12 con la contraseña (MAC verify).
     * 3. Extracción de clave privada + hoja + cadena.
     * 4. Guardia de vencimiento sobre notAfter.
     *
     * # Errors:
     * - `CertificadoNoEncontrado` ante ausencia física.
     * - `ContrasenaIncorrecta` si el descifrado falla.
     * - `CredencialIncompleta` si faltan clave u hoja.
     * - `CertificadoVencido` si notAfter quedó en el pasado.
     */
    #[instrument(skip(contrasena))]
    pub fn cargar(ruta: &Path, contrasena: &str) -> Result<Self, FirmaError> {
        let bytes_p12 = std::fs::read(ruta)
            .map_err(|_| FirmaError::CertificadoNoEncontrado(ruta.display().to_string()))?;

        let contenedor = Pkcs12::from_der(&bytes_p12)
            .map_err(|_| FirmaError::CertificadoNoEncontrado(ruta.display().to_string()))?;

        // Un fallo de parse2 con contenedor bien formado es, en la práctica,
        // una contraseña incorrecta (MAC verify failure).
        let credencial = contenedor
            .parse2(contrasena)
            .map_err(|_| FirmaError::ContrasenaIncorrecta)?;

        let clave_privada = credencial
            .pkey
            .ok_or_else(|| FirmaError::CredencialIncompleta("clave privada ausente".into()))?;

        let certificado_hoja = credencial
            .cert
            .ok_or_else(|| FirmaError::CredencialIncompleta("certificado hoja ausente".into()))?;

        let cadena = credencial
            .ca
            .map(|stack| stack.iter().map(|cert| cert.to_owned()).collect())
            .unwrap_or_default();

        let resultado = Self {
            clave_privada,
            certificado_hoja,
            cadena,
        };

        resultado.verificar_vigencia()?;

        info!(
            "🔐 [CERTIFICADO]: Credential loaded. Subject: [{}], notAfter: [{}]",
            resultado.info().sujeto,
            resultado.info().not_after
        );

        Ok(resultado)
    }

    fn verificar_vigencia(&self) -> Result<(), FirmaError> {
        let ahora = Asn1Time::days_from_now(0)?;
        let not_after = self.certificado_hoja.not_after();

        if not_after.compare(ahora.as_ref())? == Ordering::Less {
            return Err(FirmaError::CertificadoVencido(not_after.to_string()));
        }
        Ok(())
    }

    pub fn clave_privada(&self) -> &PKey<Private> {
        &self.clave_privada
    }

    pub fn certificado_hoja(&self) -> &X509 {
        &self.certificado_hoja
    }

    pub fn cadena(&self) -> &[X509] {
        &self.cadena
    }

    /// DER del certificado hoja para el bloque X509Certificate.
    pub fn hoja_der(&self) -> Result<Vec<u8>, FirmaError> {
        Ok(self.certificado_hoja.to_der()?)
    }

    /// Introspección administrativa de la credencial.
    pub fn info(&self) -> InfoCertificado {
        let extraer_cn = |nombre: &openssl::x509::X509NameRef| {
            nombre
                .entries_by_nid(Nid::COMMONNAME)
                .next()
                .and_then(|entrada| entrada.data().as_utf8().ok().map(|s| s.to_string()))
                .unwrap_or_else(|| "SIN_CN".to_string())
        };

        InfoCertificado {
            sujeto: extraer_cn(self.certificado_hoja.subject_name()),
            emisor: extraer_cn(self.certificado_hoja.issuer_name()),
            not_after: self.certificado_hoja.not_after().to_string(),
        }
    }
}

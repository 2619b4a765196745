// [libs/infra/firma/src/errors.rs]
/*!
 * =================================================================
 * APARATO: CATÁLOGO DE ERRORES DE FIRMA (V2.0 - SOBERANO)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS CRIPTOGRÁFICOS
 *
 * Todo fallo de este estrato es fatal para el comprobante: el
 * orquestador lo proyecta directamente al estado Fallido.
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FirmaError {
    /// El archivo .p12 no existe o no se puede leer.
    #[error("[L3_FIRMA_FAULT]: CERTIFICADO_NO_ENCONTRADO -> {0}")]
    CertificadoNoEncontrado(String),

    /// La credencial no descifra con la contraseña provista.
    #[error("[L3_FIRMA_FAULT]: CONTRASENA_INCORRECTA")]
    ContrasenaIncorrecta,

    /// El campo notAfter del certificado hoja quedó en el pasado.
    #[error("[L3_FIRMA_FAULT]: CERTIFICADO_VENCIDO -> notAfter {0}")]
    CertificadoVencido(String),

    /// El contenedor PKCS#12 no trae clave privada u hoja X.509.
    #[error("[L3_FIRMA_FAULT]: CREDENCIAL_INCOMPLETA -> {0}")]
    CredencialIncompleta(String),

    /// Colapso del motor criptográfico durante el firmado.
    #[error("[L3_FIRMA_FAULT]: MOTOR_CRIPTOGRAFICO -> {0}")]
    MotorCriptografico(#[from] openssl::error::ErrorStack),

    /// El documento a firmar no es XML bien formado.
    #[error("[L3_FIRMA_FAULT]: XML_ILEGIBLE -> {0}")]
    XmlIlegible(String),
}

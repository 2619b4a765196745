// [libs/core/sri/src/clave_acceso.rs]
/*!
 * =================================================================
 * APARATO: GENERADOR DE CLAVE DE ACCESO (V4.1 - MOD-11 CERTIFIED)
 * CLASIFICACIÓN: CORE LOGIC (ESTRATO L1)
 * RESPONSABILIDAD: CONSTRUCCIÓN DE LA CLAVE DE 49 DÍGITOS SEGÚN FÓRMULA OFICIAL
 *
 * # Mathematical Proof (Módulo 11):
 * Sea S = Σ d_i · m_i con el ciclo de multiplicadores [2..9] aplicado de
 * derecha a izquierda sobre los 48 dígitos base. El dígito verificador es
 * 11 − (S mod 11), con las proyecciones 11→0 y 10→1. La verificación
 * recalcula S y compara: la clave es válida sii dv(base48) == clave[48].
 * =================================================================
 */

use chrono::{NaiveDate, Timelike, Utc};

use crate::errors::SriCoreError;

/// Ciclo oficial de multiplicadores del módulo 11, de derecha a izquierda.
const MULTIPLICADORES: [u32; 8] = [2, 3, 4, 5, 6, 7, 8, 9];

/// Componentes de la clave de acceso en el orden oficial de concatenación.
#[derive(Debug, Clone)]
pub struct ParametrosClave<'a> {
    pub fecha_emision: NaiveDate,
    /// Tipo de comprobante (2 dígitos, "01" factura).
    pub tipo_comprobante: &'a str,
    /// RUC del emisor (13 dígitos).
    pub ruc: &'a str,
    /// Ambiente: "1" pruebas, "2" producción.
    pub ambiente: &'a str,
    /// Establecimiento (3 dígitos).
    pub establecimiento: &'a str,
    /// Punto de emisión (3 dígitos).
    pub punto_emision: &'a str,
    pub secuencial: u32,
    /// Tipo de emisión: "1" normal, "2" contingencia.
    pub tipo_emision: &'a str,
}

/**
 * Calcula el dígito verificador módulo 11 de una cadena decimal.
 *
 * # Logic:
 * Recorre la cadena desde el último dígito aplicando el ciclo [2..9].
 * Los resultados crudos 11 y 10 se proyectan a 0 y 1 respectivamente.
 *
 * # Errors:
 * - `ComponenteMalformado` si la cadena contiene algo fuera de [0-9].
 */
pub fn calcular_digito_verificador(cadena: &str) -> Result<u8, SriCoreError> {
    if cadena.is_empty() {
        return Err(SriCoreError::ComponenteMalformado {
            campo: "cadena_base",
            valor: cadena.to_string(),
        });
    }

    let mut suma: u32 = 0;
    for (indice, caracter) in cadena.chars().rev().enumerate() {
        let digito = caracter.to_digit(10).ok_or_else(|| SriCoreError::ComponenteMalformado {
            campo: "cadena_base",
            valor: cadena.to_string(),
        })?;
        suma += digito * MULTIPLICADORES[indice % MULTIPLICADORES.len()];
    }

    let crudo = 11 - (suma % 11);
    Ok(match crudo {
        11 => 0,
        10 => 1,
        otro => otro as u8,
    })
}

/**
 * Genera la clave de acceso de 49 dígitos según la fórmula oficial SRI.
 *
 * Formato: DDMMYYYY(8) | tipo(2) | RUC(13) | ambiente(1) | estab(3) |
 * ptoEmi(3) | secuencial(9) | tipoEmision(1) | codigoNumerico(8) | dv(1).
 *
 * # Logic:
 * El código numérico de entropía se recibe como parámetro explícito para
 * que la regeneración desde un comprobante persistido sea bit-idéntica.
 *
 * # Errors:
 * Rechaza componentes con longitud o alfabeto ilegales antes de concatenar.
 */
pub fn generar_clave_acceso(
    parametros: &ParametrosClave<'_>,
    codigo_numerico: &str,
) -> Result<String, SriCoreError> {
    validar_componente("tipo_comprobante", parametros.tipo_comprobante, 2)?;
    validar_componente("ruc", parametros.ruc, 13)?;
    validar_componente("ambiente", parametros.ambiente, 1)?;
    validar_componente("establecimiento", parametros.establecimiento, 3)?;
    validar_componente("punto_emision", parametros.punto_emision, 3)?;
    validar_componente("tipo_emision", parametros.tipo_emision, 1)?;
    validar_componente("codigo_numerico", codigo_numerico, 8)?;

    if parametros.secuencial == 0 || parametros.secuencial > 999_999_999 {
        return Err(SriCoreError::ComponenteMalformado {
            campo: "secuencial",
            valor: parametros.secuencial.to_string(),
        });
    }

    let base48 = format!(
        "{}{}{}{}{}{}{:09}{}{}",
        parametros.fecha_emision.format("%d%m%Y"),
        parametros.tipo_comprobante,
        parametros.ruc,
        parametros.ambiente,
        parametros.establecimiento,
        parametros.punto_emision,
        parametros.secuencial,
        parametros.tipo_emision,
        codigo_numerico,
    );

    let digito = calcular_digito_verificador(&base48)?;
    Ok(format!("{}{}", base48, digito))
}

/// Deriva el código numérico de 8 dígitos desde la fracción sub-segundo
/// del reloj. Su único propósito es entropía; debe registrarse junto al
/// comprobante para que la regeneración sea idempotente.
pub fn codigo_numerico_desde_reloj() -> String {
    let nanosegundos = Utc::now().nanosecond();
    format!("{:08}", nanosegundos % 100_000_000)
}

/// Formatea el número legible del comprobante: `001-001-000000001`.
pub fn formatear_numero(establecimiento: &str, punto_emision: &str, secuencial: u32) -> String {
    format!("{}-{}-{:09}", establecimiento, punto_emision, secuencial)
}

/**
 * Parsea un número formateado de vuelta a su tripleta.
 *
 * Ley de ida y vuelta: `formatear(parsear(n)) == n` para todo número válido.
 */
pub fn parsear_numero(numero: &str) -> Result<(String, String, u32), SriCoreError> {
    let segmentos: Vec<&str> = numero.split('-').collect();
    if segmentos.len() != 3 {
        return Err(SriCoreError::NumeroMalformado(numero.to_string()));
    }

    let (establecimiento, punto, secuencial_crudo) = (segmentos[0], segmentos[1], segmentos[2]);

    if establecimiento.len() != 3
        || punto.len() != 3
        || secuencial_crudo.len() != 9
        || !es_decimal(establecimiento)
        || !es_decimal(punto)
        || !es_decimal(secuencial_crudo)
    {
        return Err(SriCoreError::NumeroMalformado(numero.to_string()));
    }

    let secuencial: u32 = secuencial_crudo
        .parse()
        .map_err(|_| SriCoreError::NumeroMalformado(numero.to_string()))?;

    if secuencial == 0 {
        return Err(SriCoreError::NumeroMalformado(numero.to_string()));
    }

    Ok((establecimiento.to_string(), punto.to_string(), secuencial))
}

fn validar_componente(campo: &'static str, valor: &str, longitud: usize) -> Result<(), SriCoreError> {
    if valor.len() != longitud || !es_decimal(valor) {
        return Err(SriCoreError::ComponenteMalformado {
            campo,
            valor: valor.to_string(),
        });
    }
    Ok(())
}

fn es_decimal(valor: &str) -> bool {
    !valor.is_empty() && valor.chars().all(|c| c.is_ascii_digit())
}

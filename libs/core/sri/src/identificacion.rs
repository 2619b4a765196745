// [libs/core/sri/src/identificacion.rs]
/*!
 * =================================================================
 * APARATO: VALIDADOR DE IDENTIFICACIONES (V2.0 - SOBERANO)
 * CLASIFICACIÓN: CORE LOGIC (ESTRATO L1)
 * RESPONSABILIDAD: VALIDACIÓN DE RUC Y CÉDULA ECUATORIANA (MÓDULO 10)
 * =================================================================
 */

use crate::errors::SriCoreError;

/// Coeficientes del módulo 10 para los nueve primeros dígitos de la cédula.
const COEFICIENTES_CEDULA: [u32; 9] = [2, 1, 2, 1, 2, 1, 2, 1, 2];

/**
 * Valida que el RUC tenga exactamente 13 dígitos decimales.
 *
 * # Errors:
 * - `RucInvalido` con el valor ofensivo.
 */
pub fn validar_ruc(ruc: &str) -> Result<(), SriCoreError> {
    if ruc.len() != 13 || !ruc.chars().all(|c| c.is_ascii_digit()) {
        return Err(SriCoreError::RucInvalido(ruc.to_string()));
    }
    Ok(())
}

/**
 * Valida una cédula ecuatoriana con el algoritmo módulo 10.
 *
 * # Logic:
 * 1. Diez dígitos decimales exactos.
 * 2. Código de provincia en [1, 24].
 * 3. Tercer dígito ≤ 6 (personas naturales).
 * 4. Suma ponderada con coeficientes [2,1,...]; los productos > 9 se
 *    reducen restando 9. El verificador es (10 − suma mod 10) mod 10.
 *
 * # Errors:
 * - `CedulaInvalida` ante cualquier violación estructural o aritmética.
 */
pub fn validar_cedula(cedula: &str) -> Result<(), SriCoreError> {
    let rechazo = || SriCoreError::CedulaInvalida(cedula.to_string());

    if cedula.len() != 10 || !cedula.chars().all(|c| c.is_ascii_digit()) {
        return Err(rechazo());
    }

    let digitos: Vec<u32> = cedula.chars().filter_map(|c| c.to_digit(10)).collect();

    let provincia = digitos[0] * 10 + digitos[1];
    if !(1..=24).contains(&provincia) {
        return Err(rechazo());
    }

    if digitos[2] > 6 {
        return Err(rechazo());
    }

    let mut suma = 0;
    for indice in 0..9 {
        let mut producto = digitos[indice] * COEFICIENTES_CEDULA[indice];
        if producto > 9 {
            producto -= 9;
        }
        suma += producto;
    }

    let verificador = (10 - (suma % 10)) % 10;
    if verificador != digitos[9] {
        return Err(rechazo());
    }

    Ok(())
}

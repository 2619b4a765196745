// [libs/infra/db/src/repositories/comprobante.rs]
/*!
 * =================================================================
 * APARATO: REPOSITORIO DE COMPROBANTES (V4.4 - AUDIT VAULT)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA POR TRANSICIÓN DEL COMPROBANTE
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. TRANSITION PERSISTENCE: El orquestador persiste tras cada etapa;
 *    un colapso entre etapas se recupera releyendo el último estado.
 * 2. TERMINAL SEAL: Una fila en estado terminal solo admite la adición
 *    de mensajes observacionales; cualquier otra mutación es rechazada.
 * 3. NUMBER COHERENCE: El número formateado se recalcula desde la
 *    tripleta en cada escritura y debe coincidir con el almacenado.
 * =================================================================
 */

use libsql::{params, Value};
use tracing::{debug, instrument};

use factel_domain_models::{
    Ambiente, Comprobante, EstadoComprobante, MensajeSri, TipoComprobante, TipoEmision, VentaView,
};

use crate::client::LedgerClient;
use crate::errors::DbError;

/// Bóveda de auditoría de comprobantes: las filas jamás se eliminan.
pub struct ComprobanteRepository {
    database_client: LedgerClient,
}

impl ComprobanteRepository {
    pub fn new(client: LedgerClient) -> Self {
        Self {
            database_client: client,
        }
    }

    /**
     * Persiste el comprobante tras una transición de estado (upsert).
     *
     * # Logic:
     * 1. Verifica la coherencia del número formateado contra la tripleta.
     * 2. Si la fila existente está en estado terminal, solo se permite
     *    la actualización del rastro de mensajes (sello inmutable).
     *
     * # Errors:
     * - `NumeroIncoherente` si la derivación no coincide.
     * - `EstadoTerminalInmutable` ante una sobrescritura sellada.
     */
    #[instrument(skip(self, comprobante, venta))]
    pub async fn persistir(
        &self,
        comprobante: &Comprobante,
        venta: Option<&VentaView>,
    ) -> Result<(), DbError> {
        let numero_derivado = comprobante.numero_formateado();

        let database_connection = self.database_client.conexion()?;

        // --- FASE 1: GUARDIA DE SELLO TERMINAL ---
        let mut estado_previo_rows = database_connection
            .query(
                "SELECT estado FROM comprobantes WHERE id = ?1",
                params![comprobante.id.clone()],
            )
            .await?;

        if let Some(data_row) = estado_previo_rows.next().await? {
            let etiqueta_previa: String = data_row.get(0)?;
            let estado_previo = EstadoComprobante::desde_str(&etiqueta_previa);

            if estado_previo.es_terminal() && estado_previo != comprobante.estado {
                return Err(DbError::EstadoTerminalInmutable(comprobante.id.clone()));
            }

            if estado_previo.es_terminal() {
                // Solo el rastro observacional puede crecer en un sello terminal.
                let mensajes_json = serde_json::to_string(&comprobante.mensajes)
                    .map_err(|fallo| DbError::MappingError(fallo.to_string()))?;

                database_connection
                    .execute(
                        "UPDATE comprobantes SET mensajes_json = ?1, updated_at = CURRENT_TIMESTAMP
                         WHERE id = ?2",
                        params![mensajes_json, comprobante.id.clone()],
                    )
                    .await?;
                return Ok(());
            }
        }

        // --- FASE 2: UPSERT COMPLETO DE LA TRANSICIÓN ---
        let mensajes_json = serde_json::to_string(&comprobante.mensajes)
            .map_err(|fallo| DbError::MappingError(fallo.to_string()))?;

        let venta_json = match venta {
            Some(vista) => Value::Text(
                serde_json::to_string(vista)
                    .map_err(|fallo| DbError::MappingError(fallo.to_string()))?,
            ),
            None => Value::Null,
        };

        database_connection
            .execute(
                "INSERT INTO comprobantes (
                    id, venta_ref, tipo, establecimiento, punto_emision, secuencial,
                    numero_formateado, clave_acceso, codigo_numerico, ambiente, tipo_emision,
                    fecha_emision, estado, xml_generado, xml_firmado, xml_autorizado,
                    numero_autorizacion, fecha_autorizacion, mensajes_json, venta_json
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                           ?15, ?16, ?17, ?18, ?19, ?20)
                 ON CONFLICT(id) DO UPDATE SET
                    clave_acceso = ?8,
                    codigo_numerico = ?9,
                    estado = ?13,
                    xml_generado = ?14,
                    xml_firmado = ?15,
                    xml_autorizado = ?16,
                    numero_autorizacion = ?17,
                    fecha_autorizacion = ?18,
                    mensajes_json = ?19,
                    venta_json = COALESCE(?20, venta_json),
                    updated_at = CURRENT_TIMESTAMP",
                params![
                    comprobante.id.clone(),
                    comprobante.venta_ref.clone(),
                    comprobante.tipo.codigo(),
                    comprobante.establecimiento.clone(),
                    comprobante.punto_emision.clone(),
                    comprobante.secuencial as i64,
                    numero_derivado,
                    comprobante.clave_acceso.clone(),
                    comprobante.codigo_numerico.clone(),
                    comprobante.ambiente.codigo(),
                    comprobante.tipo_emision.codigo(),
                    comprobante.fecha_emision.format("%Y-%m-%d").to_string(),
                    comprobante.estado.as_str(),
                    valor_de_opcional(&comprobante.xml_generado),
                    valor_de_opcional(&comprobante.xml_firmado),
                    valor_de_opcional(&comprobante.xml_autorizado),
                    valor_de_opcional(&comprobante.numero_autorizacion),
                    valor_de_opcional(&comprobante.fecha_autorizacion),
                    mensajes_json,
                    venta_json,
                ],
            )
            .await?;

        debug!(
            "💾 [VAULT]: Comprobante [{}] sealed at state [{}].",
            comprobante.id,
            comprobante.estado.as_str()
        );
        Ok(())
    }

    /**
     * Recupera un comprobante por su identificador interno.
     *
     * # Errors:
     * - `ComprobanteNoEncontrado` si la fila no existe.
     * - `NumeroIncoherente` si la fila viola la derivación del número.
     */
    #[instrument(skip(self))]
    pub async fn obtener(&self, id: &str) -> Result<Comprobante, DbError> {
        let database_connection = self.database_client.conexion()?;
        let mut query_results = database_connection
            .query(
                &format!("{} WHERE id = ?1", SELECT_COMPROBANTE),
                params![id],
            )
            .await?;

        match query_results.next().await? {
            Some(data_row) => mapear_fila(&data_row),
            None => Err(DbError::ComprobanteNoEncontrado),
        }
    }

    /// Búsqueda por clave de acceso (consulta administrativa de autorización).
    pub async fn buscar_por_clave(&self, clave_acceso: &str) -> Result<Option<Comprobante>, DbError> {
        let database_connection = self.database_client.conexion()?;
        let mut query_results = database_connection
            .query(
                &format!("{} WHERE clave_acceso = ?1", SELECT_COMPROBANTE),
                params![clave_acceso],
            )
            .await?;

        match query_results.next().await? {
            Some(data_row) => Ok(Some(mapear_fila(&data_row)?)),
            None => Ok(None),
        }
    }

    /// Recupera el snapshot de venta persistido junto al comprobante.
    pub async fn obtener_venta(&self, id: &str) -> Result<Option<VentaView>, DbError> {
        let database_connection = self.database_client.conexion()?;
        let mut query_results = database_connection
            .query(
                "SELECT venta_json FROM comprobantes WHERE id = ?1",
                params![id],
            )
            .await?;

        match query_results.next().await? {
            Some(data_row) => match texto_opcional(&data_row, 0)? {
                Some(json) => serde_json::from_str(&json)
                    .map(Some)
                    .map_err(|fallo| DbError::MappingError(fallo.to_string())),
                None => Ok(None),
            },
            None => Err(DbError::ComprobanteNoEncontrado),
        }
    }
}

/// Proyección de Option<String> hacia el sistema de valores de libSQL.
fn valor_de_opcional(valor: &Option<String>) -> Value {
    match valor {
        Some(texto) => Value::Text(texto.clone()),
        None => Value::Null,
    }
}

/// Lectura tolerante a NULL de una columna de texto.
fn texto_opcional(data_row: &libsql::Row, indice: i32) -> Result<Option<String>, DbError> {
    match data_row.get_value(indice)? {
        Value::Text(texto) => Ok(Some(texto)),
        Value::Null => Ok(None),
        otro => Err(DbError::MappingError(format!(
            "columna {} con tipo inesperado: {:?}",
            indice, otro
        ))),
    }
}

/// Proyección canónica de columnas para la rehidratación del agregado.
const SELECT_COMPROBANTE: &str = "SELECT id, venta_ref, tipo, establecimiento, punto_emision, \
     secuencial, numero_formateado, clave_acceso, codigo_numerico, ambiente, tipo_emision, \
     fecha_emision, estado, xml_generado, xml_firmado, xml_autorizado, numero_autorizacion, \
     fecha_autorizacion, mensajes_json, created_at, updated_at FROM comprobantes";

fn mapear_fila(data_row: &libsql::Row) -> Result<Comprobante, DbError> {
    let a_mapeo = |fallo: String| DbError::MappingError(fallo);

    let id: String = data_row.get(0)?;
    let venta_ref: String = data_row.get(1)?;
    let tipo_codigo: String = data_row.get(2)?;
    let establecimiento: String = data_row.get(3)?;
    let punto_emision: String = data_row.get(4)?;
    let secuencial_crudo: i64 = data_row.get(5)?;
    let numero_formateado: String = data_row.get(6)?;
    let clave_acceso: String = data_row.get(7)?;
    let codigo_numerico: String = data_row.get(8)?;
    let ambiente_codigo: String = data_row.get(9)?;
    let tipo_emision_codigo: String = data_row.get(10)?;
    let fecha_emision_cruda: String = data_row.get(11)?;
    let estado_etiqueta: String = data_row.get(12)?;
    let xml_generado = texto_opcional(data_row, 13)?;
    let xml_firmado = texto_opcional(data_row, 14)?;
    let xml_autorizado = texto_opcional(data_row, 15)?;
    let numero_autorizacion = texto_opcional(data_row, 16)?;
    let fecha_autorizacion = texto_opcional(data_row, 17)?;
    let mensajes_json: String = data_row.get(18)?;
    let created_at: String = data_row.get(19)?;
    let updated_at: String = data_row.get(20)?;

    let tipo = TipoComprobante::desde_codigo(&tipo_codigo)
        .map_err(|fallo| a_mapeo(fallo.to_string()))?;

    let secuencial = u32::try_from(secuencial_crudo)
        .map_err(|_| a_mapeo(format!("secuencial corrupto: {}", secuencial_crudo)))?;

    // Invariante de coherencia: el número almacenado debe ser derivable.
    let numero_derivado = format!("{}-{}-{:09}", establecimiento, punto_emision, secuencial);
    if numero_derivado != numero_formateado {
        return Err(DbError::NumeroIncoherente(numero_formateado));
    }

    let fecha_emision = chrono::NaiveDate::parse_from_str(&fecha_emision_cruda, "%Y-%m-%d")
        .map_err(|fallo| a_mapeo(format!("fecha corrupta: {}", fallo)))?;

    let mensajes: Vec<MensajeSri> = serde_json::from_str(&mensajes_json)
        .map_err(|fallo| a_mapeo(fallo.to_string()))?;

    let tipo_emision = if tipo_emision_codigo == "2" {
        TipoEmision::Contingencia
    } else {
        TipoEmision::Normal
    };

    Ok(Comprobante {
        id,
        venta_ref,
        tipo,
        establecimiento,
        punto_emision,
        secuencial,
        clave_acceso,
        codigo_numerico,
        ambiente: Ambiente::desde_codigo(&ambiente_codigo),
        tipo_emision,
        fecha_emision,
        estado: EstadoComprobante::desde_str(&estado_etiqueta),
        xml_generado,
        xml_firmado,
        xml_autorizado,
        numero_autorizacion,
        fecha_autorizacion,
        mensajes,
        created_at,
        updated_at,
    })
}

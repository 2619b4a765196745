// [libs/infra/db/src/repositories/secuencial.rs]
/*!
 * =================================================================
 * APARATO: ASIGNADOR SECUENCIAL (V4.3 - TACTICAL LEDGER GUARD)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: NUMERACIÓN MONÓTONA ATÓMICA POR (EMISOR, TIPO)
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DOUBLE LOCK: Mutex asíncrono para serializar la ráfaga intra-proceso
 *    más transacción IMMEDIATE para la exclusión entre procesos.
 * 2. GAP TOLERANCE: Un secuencial consumido jamás retrocede; los huecos
 *    por fallos aguas abajo son legales ante el SRI.
 * 3. READ-THROUGH CACHE: Caché de mejor esfuerzo para lecturas de
 *    observabilidad; la asignación SIEMPRE atraviesa el candado.
 *
 * # Mathematical Proof (Transactional Exclusivity):
 * Dentro de la sección crítica la secuencia lee v, escribe v+1 y
 * compromete. Dos llamadores concurrentes obtienen valores distintos
 * porque la lectura y la escritura comparten el mismo candado; el
 * conjunto devuelto por N llamadas sobre un contador fresco es
 * exactamente {1..N}, sin huecos ni duplicados.
 * =================================================================
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use libsql::{params, TransactionBehavior};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::client::LedgerClient;
use crate::errors::DbError;

/// Techo legal del secuencial SRI (9 dígitos).
const SECUENCIAL_MAXIMO: u32 = 999_999_999;
/// Reintentos ante contención de escritura del motor SQLite.
const REINTENTOS_POR_CONTENCION: u32 = 50;
/// Pausa entre reintentos de contención.
const PAUSA_CONTENCION_MS: u64 = 10;

/// Repositorio de autoridad única para la numeración de comprobantes.
#[derive(Clone)]
pub struct SecuencialRepository {
    database_client: LedgerClient,
    /// Candado de asignación intra-proceso.
    allocation_lock: Arc<Mutex<()>>,
    /// Caché read-through de mejor esfuerzo: (emisor, tipo) → último valor asignado.
    counter_cache: Arc<Mutex<HashMap<(String, String), u32>>>,
}

impl SecuencialRepository {
    pub fn new(client: LedgerClient) -> Self {
        Self {
            database_client: client,
            allocation_lock: Arc::new(Mutex::new(())),
            counter_cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /**
     * Asigna el siguiente secuencial libre en [1, 999999999].
     *
     * # Errors:
     * - `SecuenciaAgotada` al superar el techo legal.
     * - `TransactionError` si la secuencia atómica colapsa tras los reintentos.
     *
     * # Performance:
     * O(1) con índice primario compuesto. La contención se resuelve con
     * reintentos acotados bajo el candado intra-proceso.
     */
    #[instrument(skip(self))]
    pub async fn siguiente(&self, emisor: &str, tipo: &str) -> Result<u32, DbError> {
        let _guard = self.allocation_lock.lock().await;

        let mut intento = 0;
        loop {
            match self.intentar_asignacion(emisor, tipo).await {
                Ok(valor) => {
                    self.counter_cache
                        .lock()
                        .await
                        .insert((emisor.to_string(), tipo.to_string()), valor);
                    return Ok(valor);
                }
                Err(DbError::QueryError(fallo)) if es_contencion(&fallo) => {
                    intento += 1;
                    if intento >= REINTENTOS_POR_CONTENCION {
                        warn!("⚠️ [SECUENCIA]: Write contention exhausted after {} attempts.", intento);
                        return Err(DbError::TransactionError);
                    }
                    tokio::time::sleep(Duration::from_millis(PAUSA_CONTENCION_MS)).await;
                }
                Err(otro_fallo) => return Err(otro_fallo),
            }
        }
    }

    /// Sección crítica: leer v, escribir v+1, comprometer, devolver v.
    async fn intentar_asignacion(&self, emisor: &str, tipo: &str) -> Result<u32, DbError> {
        let database_connection = self.database_client.conexion()?;

        let database_transaction = database_connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await?;

        let mut query_results = database_transaction
            .query(
                "SELECT valor FROM secuencias WHERE emisor = ?1 AND tipo = ?2",
                params![emisor, tipo],
            )
            .await?;

        let valor_actual: u32 = match query_results.next().await? {
            Some(data_row) => {
                let crudo: i64 = data_row.get(0)?;
                u32::try_from(crudo).map_err(|_| {
                    DbError::MappingError(format!("contador corrupto: {}", crudo))
                })?
            }
            None => {
                // Génesis del contador para la pareja (emisor, tipo).
                database_transaction
                    .execute(
                        "INSERT INTO secuencias (emisor, tipo, valor) VALUES (?1, ?2, 1)",
                        params![emisor, tipo],
                    )
                    .await?;
                1
            }
        };

        if valor_actual > SECUENCIAL_MAXIMO {
            return Err(DbError::SecuenciaAgotada {
                emisor: emisor.to_string(),
                tipo: tipo.to_string(),
            });
        }

        database_transaction
            .execute(
                "UPDATE secuencias SET valor = ?1, updated_at = CURRENT_TIMESTAMP
                 WHERE emisor = ?2 AND tipo = ?3",
                params![(valor_actual + 1) as i64, emisor, tipo],
            )
            .await?;

        database_transaction
            .commit()
            .await
            .map_err(|_| DbError::TransactionError)?;

        debug!("🔢 [SECUENCIA]: Allocated {} for ({}, {}).", valor_actual, emisor, tipo);
        Ok(valor_actual)
    }

    /**
     * Lectura de observabilidad del contador, sin incremento.
     *
     * # Logic:
     * Atiende primero la caché read-through; ante un fallo de caché
     * consulta el Ledger. Jamás participa en la asignación.
     */
    pub async fn actual(&self, emisor: &str, tipo: &str) -> Result<u32, DbError> {
        if let Some(valor) = self
            .counter_cache
            .lock()
            .await
            .get(&(emisor.to_string(), tipo.to_string()))
        {
            return Ok(*valor);
        }

        let database_connection = self.database_client.conexion()?;
        let mut query_results = database_connection
            .query(
                "SELECT valor FROM secuencias WHERE emisor = ?1 AND tipo = ?2",
                params![emisor, tipo],
            )
            .await?;

        match query_results.next().await? {
            Some(data_row) => {
                let crudo: i64 = data_row.get(0)?;
                Ok(u32::try_from(crudo).unwrap_or(1))
            }
            None => Ok(1),
        }
    }

    /**
     * Operación administrativa restringida: fija el contador en un valor
     * arbitrario ≥ 1 e invalida la caché.
     *
     * # Errors:
     * - `ReinicioIlegal` para valores fuera de [1, 999999999].
     */
    #[instrument(skip(self))]
    pub async fn reiniciar(&self, emisor: &str, tipo: &str, valor: u32) -> Result<(), DbError> {
        if valor == 0 || valor > SECUENCIAL_MAXIMO {
            return Err(DbError::ReinicioIlegal(valor));
        }

        let _guard = self.allocation_lock.lock().await;

        let database_connection = self.database_client.conexion()?;
        database_connection
            .execute(
                "INSERT INTO secuencias (emisor, tipo, valor) VALUES (?1, ?2, ?3)
                 ON CONFLICT(emisor, tipo) DO UPDATE SET valor = ?3, updated_at = CURRENT_TIMESTAMP",
                params![emisor, tipo, valor as i64],
            )
            .await?;

        self.counter_cache
            .lock()
            .await
            .remove(&(emisor.to_string(), tipo.to_string()));

        info!("♻️  [SECUENCIA]: Counter ({}, {}) administratively reset to {}.", emisor, tipo, valor);
        Ok(())
    }
}

/// Detecta la contención de escritura del motor SQLite.
fn es_contencion(fallo: &libsql::Error) -> bool {
    let mensaje = fallo.to_string().to_lowercase();
    mensaje.contains("busy") || mensaje.contains("locked")
}

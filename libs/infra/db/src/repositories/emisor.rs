// [libs/infra/db/src/repositories/emisor.rs]
/*!
 * =================================================================
 * APARATO: REPOSITORIO DE CONFIGURACIÓN DEL EMISOR (V2.1 - ROW GUARD)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: FILA ÚNICA DE IDENTIDAD TRIBUTARIA
 *
 * La configuración es read-mostly: el pipeline la lee al inicio de cada
 * corrida; las escrituras llegan solo por la ruta administrativa y toman
 * la fila en exclusiva dentro de una transacción IMMEDIATE.
 * =================================================================
 */

use libsql::{params, TransactionBehavior};
use tracing::{info, instrument};

use factel_domain_models::ConfiguracionEmisor;

use crate::client::LedgerClient;
use crate::errors::DbError;

pub struct EmisorRepository {
    database_client: LedgerClient,
}

impl EmisorRepository {
    pub fn new(client: LedgerClient) -> Self {
        Self {
            database_client: client,
        }
    }

    /**
     * Escritura administrativa de la fila única (bloqueo exclusivo).
     */
    #[instrument(skip(self, configuracion))]
    pub async fn guardar(&self, configuracion: &ConfiguracionEmisor) -> Result<(), DbError> {
        let payload_json = serde_json::to_string(configuracion)
            .map_err(|fallo| DbError::MappingError(fallo.to_string()))?;

        let database_connection = self.database_client.conexion()?;
        let database_transaction = database_connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await?;

        database_transaction
            .execute(
                "INSERT INTO configuracion_emisor (id, payload_json) VALUES (1, ?1)
                 ON CONFLICT(id) DO UPDATE SET payload_json = ?1, updated_at = CURRENT_TIMESTAMP",
                params![payload_json],
            )
            .await?;

        database_transaction
            .commit()
            .await
            .map_err(|_| DbError::TransactionError)?;

        info!("🏛️  [EMISOR]: Tributary identity row sealed for RUC [{}].", configuracion.ruc);
        Ok(())
    }

    /**
     * Lectura de la identidad tributaria vigente.
     *
     * # Errors:
     * - `ConfiguracionAusente` si la fila aún no fue sembrada.
     */
    pub async fn cargar(&self) -> Result<ConfiguracionEmisor, DbError> {
        let database_connection = self.database_client.conexion()?;
        let mut query_results = database_connection
            .query("SELECT payload_json FROM configuracion_emisor WHERE id = 1", ())
            .await?;

        match query_results.next().await? {
            Some(data_row) => {
                let payload_json: String = data_row.get(0)?;
                serde_json::from_str(&payload_json)
                    .map_err(|fallo| DbError::MappingError(fallo.to_string()))
            }
            None => Err(DbError::ConfiguracionAusente),
        }
    }
}

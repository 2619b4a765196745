// [libs/infra/db/src/client.rs]
/*!
 * =================================================================
 * APARATO: CLIENTE DEL LEDGER TRIBUTARIO (V5.0 - DESTINO CLASIFICADO)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: APERTURA DEL MOTOR libSQL Y PREPARACIÓN DEL ESQUEMA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DESTINO EXPLÍCITO: La URL se clasifica en un destino tipado
 *    (archivo, memoria o remoto) ANTES de tocar el motor; las reglas de
 *    token y de anclaje viven en el tipo, no en ramas dispersas.
 * 2. PREPARACIÓN ÚNICA: El esquema se aplica una sola vez sobre la
 *    conexión inicial; en modo memoria esa MISMA conexión se retiene
 *    como ancla para que SQLite no purgue las tablas entre hilos.
 * =================================================================
 */

use std::sync::Arc;

use libsql::{Builder, Connection, Database};
use tracing::{error, info, instrument};

use crate::errors::DbError;
use crate::schema::aplicar_esquema_tributario;

/// Clasificación tipada de la URL del Ledger.
enum DestinoLedger {
    /// Archivo SQLite local (`file:factel.db`).
    Archivo(String),
    /// Memoria compartida (`file:x?mode=memory&cache=shared`); exige ancla.
    Memoria(String),
    /// Cluster remoto libSQL/Turso; exige token de acceso.
    Remoto { url: String, token: String },
}

impl DestinoLedger {
    /**
     * Clasifica la URL y valida sus precondiciones.
     *
     * # Errors:
     * - `ConfigurationError` ante URL vacía o destino remoto sin token.
     */
    fn clasificar(url: &str, token: Option<String>) -> Result<Self, DbError> {
        if url.is_empty() {
            return Err(DbError::ConfigurationError(
                "DATABASE_URL vacía: el Ledger Tributario no tiene destino".into(),
            ));
        }

        if url.starts_with("libsql://") || url.starts_with("https://") {
            let token = token.filter(|valor| !valor.is_empty()).ok_or_else(|| {
                DbError::ConfigurationError(
                    "destino remoto sin DATABASE_AUTH_TOKEN".into(),
                )
            })?;
            return Ok(Self::Remoto {
                url: url.to_string(),
                token,
            });
        }

        if url.contains(":memory:") || url.contains("mode=memory") {
            return Ok(Self::Memoria(url.to_string()));
        }

        Ok(Self::Archivo(url.to_string()))
    }

    fn etiqueta(&self) -> &'static str {
        match self {
            Self::Archivo(_) => "archivo",
            Self::Memoria(_) => "memoria",
            Self::Remoto { .. } => "remoto",
        }
    }

    fn requiere_ancla(&self) -> bool {
        matches!(self, Self::Memoria(_))
    }

    async fn abrir(&self) -> Result<Database, DbError> {
        let apertura = match self {
            Self::Archivo(ruta) | Self::Memoria(ruta) => Builder::new_local(ruta).build().await,
            Self::Remoto { url, token } => {
                Builder::new_remote(url.clone(), token.clone()).build().await
            }
        };

        apertura.map_err(|fallo| {
            DbError::ConnectionError(format!("apertura del motor rechazada: {}", fallo))
        })
    }
}

/// Fachada clonable del motor libSQL con el esquema ya preparado.
#[derive(Clone)]
pub struct LedgerClient {
    motor: Arc<Database>,
    /// Conexión inicial retenida solo en modo memoria (ancla del esquema).
    ancla_memoria: Option<Arc<Connection>>,
}

impl LedgerClient {
    /**
     * Abre el Ledger, prepara el esquema y deja la fachada lista.
     *
     * # Logic:
     * Un único camino para los tres destinos: clasificar, abrir el
     * motor, preparar el esquema sobre la conexión inicial y retener
     * esa conexión únicamente cuando el destino lo exige (memoria).
     */
    #[instrument(skip(token))]
    pub async fn connect(url: &str, token: Option<String>) -> Result<Self, DbError> {
        let destino = DestinoLedger::clasificar(url, token)?;

        info!("🏦 [LEDGER]: Abriendo destino {} [{}]", destino.etiqueta(), url);

        let motor = Arc::new(destino.abrir().await?);

        let conexion_inicial = motor.connect().map_err(|fallo| {
            DbError::ConnectionError(format!("conexión inicial rechazada: {}", fallo))
        })?;

        aplicar_esquema_tributario(&conexion_inicial)
            .await
            .map_err(|fallo| {
                DbError::ConnectionError(format!("preparación del esquema fallida: {}", fallo))
            })?;

        let ancla_memoria = if destino.requiere_ancla() {
            info!("⚓ [LEDGER]: Ancla de memoria retenida; el esquema sobrevive entre hilos.");
            Some(Arc::new(conexion_inicial))
        } else {
            None
        };

        Ok(Self {
            motor,
            ancla_memoria,
        })
    }

    /// Conexión fresca del pool del motor.
    pub fn conexion(&self) -> Result<Connection, DbError> {
        self.motor.connect().map_err(|fallo| {
            error!("⚠️ [LEDGER]: Asignación de conexión rechazada: {}", fallo);
            DbError::ConnectionError(fallo.to_string())
        })
    }
}

// [libs/infra/db/src/schema.rs]
/**
 * =================================================================
 * APARATO: ESQUEMA DEL LEDGER TRIBUTARIO (V4.2 - AUDIT STRATA)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GOBERNANZA ESTRUCTURAL E IDEMPOTENCIA TOTAL
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. AUDIT PERMANENCE: Los comprobantes jamás se eliminan; el esquema
 *    no contempla DELETE para la tabla central.
 * 2. IDEMPOTENCIA: Gestión de errores para migraciones en caliente.
 * 3. PERFORMANCE: Índices de aceleración para la consulta por clave.
 * =================================================================
 */

use anyhow::{Context, Result};
use libsql::Connection;
use tracing::{debug, info, instrument, warn};

/**
 * ESTRATO 1: SOLIDIFICACIÓN (Génesis de Tablas)
 */
const TABLAS_TRIBUTARIAS: &[(&str, &str)] = &[
    ("TABLE_COMPROBANTES", r#"
        CREATE TABLE IF NOT EXISTS comprobantes (
            id TEXT PRIMARY KEY,
            venta_ref TEXT NOT NULL,
            tipo TEXT NOT NULL,
            establecimiento TEXT NOT NULL,
            punto_emision TEXT NOT NULL,
            secuencial INTEGER NOT NULL,
            numero_formateado TEXT NOT NULL,
            clave_acceso TEXT DEFAULT '',
            ambiente TEXT NOT NULL,
            fecha_emision TEXT NOT NULL,
            estado TEXT DEFAULT 'PENDIENTE',
            xml_generado TEXT,
            xml_firmado TEXT,
            xml_autorizado TEXT,
            numero_autorizacion TEXT,
            fecha_autorizacion TEXT,
            mensajes_json TEXT DEFAULT '[]',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),
    ("TABLE_SECUENCIAS", r#"
        CREATE TABLE IF NOT EXISTS secuencias (
            emisor TEXT NOT NULL,
            tipo TEXT NOT NULL,
            valor INTEGER NOT NULL DEFAULT 1,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY(emisor, tipo)
        );
    "#),
    ("TABLE_CONFIGURACION_EMISOR", r#"
        CREATE TABLE IF NOT EXISTS configuracion_emisor (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            payload_json TEXT NOT NULL,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),
];

/**
 * ESTRATO 2: EVOLUCIÓN (Mutaciones de Columna)
 * Asegura que instalaciones previas se adapten a las nuevas capacidades.
 */
const ESTRATOS_EVOLUTIVOS: &[(&str, &str)] = &[
    // --- REGENERACIÓN IDEMPOTENTE DE CLAVES ---
    ("COMPROBANTE_CODIGO_NUMERICO", "ALTER TABLE comprobantes ADD COLUMN codigo_numerico TEXT DEFAULT ''"),
    // --- REPROCESAMIENTO SIN TOCAR EL ESQUEMA DE VENTAS ---
    ("COMPROBANTE_VENTA_JSON", "ALTER TABLE comprobantes ADD COLUMN venta_json TEXT"),
    ("COMPROBANTE_TIPO_EMISION", "ALTER TABLE comprobantes ADD COLUMN tipo_emision TEXT DEFAULT '1'"),
];

/**
 * ESTRATO 3: ENDURECIMIENTO (Índices de Aceleración)
 */
const INDICES_DE_ACELERACION: &[(&str, &str)] = &[
    ("IDX_COMPROBANTES_CLAVE", "CREATE INDEX IF NOT EXISTS idx_comprobantes_clave ON comprobantes(clave_acceso);"),
    ("IDX_COMPROBANTES_ESTADO", "CREATE INDEX IF NOT EXISTS idx_comprobantes_estado ON comprobantes(estado);"),
    ("IDX_COMPROBANTES_VENTA", "CREATE INDEX IF NOT EXISTS idx_comprobantes_venta ON comprobantes(venta_ref);"),
];

/**
 * Ejecuta la secuencia maestra de sincronización del esquema estructural.
 *
 * # Errors:
 * Retorna error si alguna tabla base falla en solidificarse.
 */
#[instrument(skip(database_connection))]
pub async fn aplicar_esquema_tributario(database_connection: &Connection) -> Result<()> {
    info!("🏗️ [SCHEMA_ENGINE]: Initiating structural synchronization V4.2...");

    solidificar_estrato_base(database_connection).await?;
    ejecutar_reparacion_evolutiva(database_connection).await?;
    endurecer_capa_de_acceso(database_connection).await?;

    info!("✅ [SCHEMA_ENGINE]: Tributary Ledger V4.2 level and certified.");
    Ok(())
}

async fn solidificar_estrato_base(db: &Connection) -> Result<()> {
    for (identifier, sql) in TABLAS_TRIBUTARIAS {
        debug!("  ↳ Solidifying: {}", identifier);
        db.execute(*sql, ())
            .await
            .with_context(|| format!("CRITICAL_SOLIDIFICATION_FAULT: {}", identifier))?;
    }
    Ok(())
}

async fn ejecutar_reparacion_evolutiva(db: &Connection) -> Result<()> {
    for (identifier, sql) in ESTRATOS_EVOLUTIVOS {
        match db.execute(*sql, ()).await {
            Ok(_) => debug!("  🟢 [REPAIR_OK]: Applied evolutionary stratum {}", identifier),
            Err(fallo) => {
                let message = fallo.to_string();
                if message.contains("duplicate column name") {
                    debug!("  ⚪ [REPAIR_SKIP]: {} already level.", identifier);
                } else {
                    warn!("  ⚠️ [REPAIR_BYPASS]: {} check incomplete: {}", identifier, message);
                }
            }
        }
    }
    Ok(())
}

async fn endurecer_capa_de_acceso(db: &Connection) -> Result<()> {
    for (identifier, sql) in INDICES_DE_ACELERACION {
        debug!("  ↳ Hardening: {}", identifier);
        db.execute(*sql, ())
            .await
            .with_context(|| format!("CRITICAL_HARDENING_FAULT: {}", identifier))?;
    }
    Ok(())
}

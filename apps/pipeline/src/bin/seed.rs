// [apps/pipeline/src/bin/seed.rs]
/**
 * =================================================================
 * APARATO: SEMBRADOR DE CONFIGURACIÓN (V2.0 - SOBERANO)
 * CLASIFICACIÓN: APPLICATION LAYER (ENTRY POINT)
 * RESPONSABILIDAD: GÉNESIS DE LA FILA ÚNICA DEL EMISOR EN EL LEDGER
 *
 * Lee la identidad tributaria desde las variables EMISOR_* y la sella
 * en la fila única `configuracion_emisor` con bloqueo exclusivo.
 * =================================================================
 */

use anyhow::{bail, Context, Result};
use tracing::info;

use factel_core_sri::validar_ruc;
use factel_infra_db::{EmisorRepository, LedgerClient};
use factel_pipeline::bootstrap::emisor_desde_entorno;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    factel_shared_vigia::init_tracing("factel_seed");

    let configuracion = emisor_desde_entorno();

    if validar_ruc(&configuracion.ruc).is_err() {
        bail!("SEED_FAULT: EMISOR_RUC ausente o malformado (se esperan 13 dígitos)");
    }
    if configuracion.razon_social.is_empty() {
        bail!("SEED_FAULT: EMISOR_RAZON_SOCIAL ausente");
    }

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "file:factel.db".into());
    let database_token = std::env::var("DATABASE_AUTH_TOKEN").ok();

    let ledger = LedgerClient::connect(&database_url, database_token)
        .await
        .context("SEED_FAULT: enlace al Ledger rechazado")?;

    EmisorRepository::new(ledger).guardar(&configuracion).await?;

    info!(
        "🌱 [SEED]: Emitter row sealed. RUC [{}], establecimiento [{}-{}], ambiente [{}].",
        configuracion.ruc,
        configuracion.establecimiento,
        configuracion.punto_emision,
        configuracion.ambiente
    );
    Ok(())
}

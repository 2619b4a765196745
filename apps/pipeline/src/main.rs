// [apps/pipeline/src/main.rs]
/**
 * =================================================================
 * APARATO: SHELL ADMINISTRATIVO DEL PIPELINE (V4.0 - SOBERANO)
 * CLASIFICACIÓN: APPLICATION LAYER (ENTRY POINT)
 * RESPONSABILIDAD: SUPERFICIE DE CONTROL CLI Y DISPARO DEL MOTOR
 *
 * Superficie administrativa (no orientada a usuario final):
 * - procesar: crea el comprobante desde una venta JSON y lo procesa.
 * - reprocesar: reanuda un comprobante desde su último estado estable.
 * - consultar: busca la autorización por clave de acceso y sella
 *   localmente los comprobantes Recibidos ya autorizados.
 * - reiniciar-secuencia: operación restringida sobre el contador.
 * - probar-correo: certificación de la configuración SMTP.
 * =================================================================
 */

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, instrument, warn};

use factel_domain_models::VentaView;
use factel_pipeline::bootstrap::ContextoAplicacion;
use factel_pipeline::PipelineError;

#[derive(Parser, Debug)]
#[command(
    name = "pipeline",
    version = "4.0",
    about = "Pipeline de facturación electrónica SRI: de la venta comprometida al comprobante autorizado."
)]
struct CommandArguments {
    #[command(subcommand)]
    comando: ComandoAdministrativo,
}

#[derive(Subcommand, Debug)]
enum ComandoAdministrativo {
    /// Crea un comprobante desde un snapshot de venta JSON y lo procesa.
    Procesar {
        /// Ruta física al snapshot JSON de la venta.
        #[arg(short, long, value_name = "VENTA_JSON")]
        venta: PathBuf,

        /// Referencia hacia la venta de origen en el sistema de ventas.
        #[arg(long, default_value = "VENTA_MANUAL")]
        venta_ref: String,
    },

    /// Reanuda un comprobante desde cualquier estado no terminal.
    Reprocesar {
        /// Identificador interno del comprobante.
        #[arg(short, long)]
        comprobante: String,
    },

    /// Consulta la autorización por clave de acceso (49 dígitos).
    Consultar {
        #[arg(short, long)]
        clave: String,
    },

    /// Operación restringida: fija el contador secuencial en un valor arbitrario.
    ReiniciarSecuencia {
        /// Tipo de comprobante ("01" factura, "04" nota de crédito...).
        #[arg(short, long, default_value = "01")]
        tipo: String,

        /// Nuevo valor del contador (≥ 1).
        #[arg(short, long)]
        valor: u32,
    },

    /// Envía un mensaje de prueba para certificar la configuración SMTP.
    ProbarCorreo {
        #[arg(short, long)]
        destinatario: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    factel_shared_vigia::init_tracing("factel_pipeline");

    let argumentos = CommandArguments::parse();
    let contexto = ContextoAplicacion::inicializar().await?;

    ejecutar_comando(&contexto, argumentos.comando).await
}

#[instrument(skip(contexto, comando))]
async fn ejecutar_comando(
    contexto: &ContextoAplicacion,
    comando: ComandoAdministrativo,
) -> Result<()> {
    match comando {
        ComandoAdministrativo::Procesar { venta, venta_ref } => {
            let contenido = std::fs::read_to_string(&venta)
                .with_context(|| format!("snapshot de venta ilegible: {}", venta.display()))?;
            let vista: VentaView =
                serde_json::from_str(&contenido).context("snapshot de venta malformado")?;

            let procesador = contexto.procesador();
            let comprobante = procesador.crear_desde_venta(&venta_ref, &vista).await?;

            match procesador.procesar(&comprobante.id).await {
                Ok(finalizado) => {
                    info!(
                        "🏁 Comprobante [{}] -> [{}]. Clave: [{}]",
                        finalizado.id,
                        finalizado.estado.as_str(),
                        finalizado.clave_acceso
                    );
                }
                Err(fallo) if fallo.es_reintentable() => {
                    warn!(
                        "⏳ Comprobante [{}] en espera (fallo reintentable): {}",
                        comprobante.id, fallo
                    );
                }
                Err(fallo) => return Err(fallo.into()),
            }
            Ok(())
        }

        ComandoAdministrativo::Reprocesar { comprobante } => {
            let procesador = contexto.procesador();
            match procesador.reprocesar(&comprobante).await {
                Ok(finalizado) => {
                    info!("🏁 Comprobante [{}] -> [{}].", finalizado.id, finalizado.estado.as_str());
                    Ok(())
                }
                Err(fallo @ PipelineError::EstadoInvalido(_)) => {
                    warn!("🛑 {}", fallo);
                    Ok(())
                }
                Err(fallo) if fallo.es_reintentable() => {
                    warn!("⏳ Fallo reintentable: {}", fallo);
                    Ok(())
                }
                Err(fallo) => Err(fallo.into()),
            }
        }

        ComandoAdministrativo::Consultar { clave } => {
            let procesador = contexto.procesador();
            let respuesta = procesador.consultar(&clave).await?;
            info!(
                "🔎 Estado: {:?}. Número: [{}], Fecha: [{}]",
                respuesta.estado, respuesta.numero_autorizacion, respuesta.fecha_autorizacion
            );
            Ok(())
        }

        ComandoAdministrativo::ReiniciarSecuencia { tipo, valor } => {
            contexto
                .secuencias
                .reiniciar(&contexto.emisor.ruc, &tipo, valor)
                .await?;
            info!("♻️  Secuencia ({}, {}) reiniciada a {}.", contexto.emisor.ruc, tipo, valor);
            Ok(())
        }

        ComandoAdministrativo::ProbarCorreo { destinatario } => {
            let despachador = contexto
                .correo
                .as_ref()
                .context("SMTP sin configurar (EMAIL_HOST_USER / EMAIL_HOST_PASSWORD)")?;

            let despachador = std::sync::Arc::clone(despachador);
            let destino = destinatario.clone();
            tokio::task::spawn_blocking(move || despachador.enviar_prueba(&destino))
                .await?
                .context("el envío de prueba colapsó")?;

            info!("📨 Mensaje de prueba despachado a [{}].", destinatario);
            Ok(())
        }
    }
}

// [libs/shared/vigia/src/lib.rs]
/*!
 * =================================================================
 * APARATO: VIGÍA TRIBUTARIO (V3.0 - GOLD MASTER)
 * CLASIFICACIÓN: SHARED UTILITY (ESTRATO L4)
 * RESPONSABILIDAD: TRAZADO DEL PIPELINE Y CAPTURA DE COLAPSOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. FORMATO NEGOCIABLE: La variable FACTEL_LOG_FORMATO decide entre
 *    tramas JSON (ingesta externa) y consola compacta; sin la variable,
 *    el perfil de compilación elige.
 * 2. SILENCIO SELECTIVO: El filtro por defecto acalla a los vecinos
 *    ruidosos reales de este workspace (hyper/reqwest del uplink SRI,
 *    lettre del despacho SMTP, libsql del Ledger) sin tocar RUST_LOG
 *    cuando el operador lo define.
 * 3. COLAPSO AUDITABLE: Un pánico fuera del flujo de etapas queda
 *    registrado con su coordenada de código antes de la defunción del
 *    proceso; un comprobante a medio procesar se reanuda luego desde
 *    su último estado persistido.
 * =================================================================
 */

use std::panic;

use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Formatos de emisión soportados por el vigía.
enum FormatoDeTrazas {
    /// Tramas JSON planas para el colector central.
    Json,
    /// Consola compacta para el operador local.
    Consola,
}

/// Inicializa el trazado del servicio e instala el escudo de pánicos.
///
/// # Errors:
/// Entra en pánico si otro suscriptor global ya fue inicializado.
pub fn init_tracing(servicio: &str) {
    let filtro = filtro_tributario(servicio);

    match formato_configurado() {
        FormatoDeTrazas::Json => {
            tracing_subscriber::registry()
                .with(filtro)
                .with(fmt::layer().json().flatten_event(true))
                .init();
        }
        FormatoDeTrazas::Consola => {
            tracing_subscriber::registry()
                .with(filtro)
                .with(fmt::layer().compact().with_target(false))
                .init();
        }
    }

    instalar_escudo_de_panicos(servicio);

    info!("🛰️  [VIGIA]: Trazado activo para [{}]. Escudo de pánicos instalado.", servicio);
}

/// FACTEL_LOG_FORMATO manda; sin ella decide el perfil de compilación.
fn formato_configurado() -> FormatoDeTrazas {
    match std::env::var("FACTEL_LOG_FORMATO").as_deref() {
        Ok("json") => FormatoDeTrazas::Json,
        Ok("consola") => FormatoDeTrazas::Consola,
        _ if cfg!(debug_assertions) => FormatoDeTrazas::Consola,
        _ => FormatoDeTrazas::Json,
    }
}

/// Construye el filtro del workspace: RUST_LOG tiene la última palabra;
/// en su ausencia se aplica la directiva por defecto del pipeline.
fn filtro_tributario(servicio: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directiva_por_defecto(servicio)))
}

fn directiva_por_defecto(servicio: &str) -> String {
    let nivel_del_servicio = if cfg!(debug_assertions) { "debug" } else { "info" };

    // Vecinos ruidosos de este workspace: el uplink SRI (hyper/reqwest),
    // el despacho SMTP (lettre) y el motor del Ledger (libsql).
    format!(
        "info,{servicio}={nivel},hyper=warn,reqwest=warn,rustls=warn,lettre=warn,libsql=error",
        servicio = servicio,
        nivel = nivel_del_servicio,
    )
}

/// Hook global: todo colapso se vuelca al rastro antes de morir. Los
/// pollers de autorización y los despachos SMTP corren en tareas
/// secundarias cuyo pánico de otro modo se perdería en silencio.
fn instalar_escudo_de_panicos(servicio: &str) {
    let etiqueta_del_servicio = servicio.to_string();

    panic::set_hook(Box::new(move |datos_del_panico| {
        let coordenada = match datos_del_panico.location() {
            Some(sitio) => format!("{}:{}", sitio.file(), sitio.line()),
            None => "coordenada-desconocida".to_string(),
        };

        let causa = if let Some(texto) = datos_del_panico.payload().downcast_ref::<String>() {
            texto.clone()
        } else if let Some(texto) = datos_del_panico.payload().downcast_ref::<&str>() {
            (*texto).to_string()
        } else {
            "carga de pánico no textual".to_string()
        };

        error!(
            target: "escudo_panico",
            servicio = %etiqueta_del_servicio,
            coordenada = %coordenada,
            "💥 [COLAPSO]: Tarea terminada abruptamente fuera del flujo de etapas: {}",
            causa
        );
    }));
}

// [libs/infra/xsd/src/lib.rs]
/*!
 * =================================================================
 * APARATO: VALIDADOR DE ESQUEMAS SRI (V3.2 - DUAL STRATA)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: VALIDACIÓN XSD CON RETROCESO ESTRUCTURAL
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SOURCE CACHE: Las fuentes XSD se leen del disco UNA sola vez al
 *    arranque y se cachean por tipo de comprobante; el contexto de
 *    compilación libxml2 se construye por llamada (no es Sync).
 * 2. FALLBACK SOBERANO: Ante la ausencia del esquema físico se ejecuta
 *    la verificación estructural mínima (raíz, infoTributaria y sus
 *    nueve hijos obligatorios, bloque de información del tipo).
 * 3. LINE DIAGNOSTICS: Los errores del motor se proyectan con número
 *    de línea para el rastro forense del comprobante.
 * =================================================================
 */

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use libxml::parser::Parser;
use libxml::schemas::{SchemaParserContext, SchemaValidationContext};
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, info, instrument, warn};

use factel_domain_models::TipoComprobante;

/// Mapeo oficial de tipo de comprobante a archivo XSD.
const MAPA_XSD: &[(TipoComprobante, &str)] = &[
    (TipoComprobante::Factura, "factura.xsd"),
    (TipoComprobante::NotaCredito, "notaCredito.xsd"),
    (TipoComprobante::NotaDebito, "notaDebito.xsd"),
    (TipoComprobante::GuiaRemision, "guiaRemision.xsd"),
    (TipoComprobante::Retencion, "retencion.xsd"),
];

/// Campos obligatorios de `infoTributaria` para la verificación estructural.
const CAMPOS_INFO_TRIBUTARIA: &[&str] = &[
    "ambiente",
    "tipoEmision",
    "razonSocial",
    "ruc",
    "claveAcceso",
    "codDoc",
    "estab",
    "ptoEmision",
    "secuencial",
];

/// Veredicto de una validación, con el origen del escrutinio.
#[derive(Debug, Clone)]
pub struct ResultadoValidacion {
    pub es_valido: bool,
    pub errores: Vec<String>,
    /// `false` cuando el veredicto proviene del retroceso estructural.
    pub con_esquema: bool,
}

/// Validador con caché de fuentes XSD por tipo de comprobante.
pub struct ValidadorXsd {
    directorio: PathBuf,
    fuentes: HashMap<TipoComprobante, String>,
}

impl ValidadorXsd {
    /**
     * Escanea el directorio de esquemas y cachea las fuentes presentes.
     *
     * La ausencia de archivos no es fatal: esos tipos validarán por el
     * retroceso estructural.
     */
    #[instrument(skip(directorio))]
    pub fn new(directorio: &Path) -> Self {
        let mut fuentes = HashMap::new();

        if !directorio.exists() {
            warn!("⚠️ [XSD]: Schema directory absent: [{}]. Structural fallback armed.", directorio.display());
        } else {
            for (tipo, nombre_archivo) in MAPA_XSD {
                let ruta = directorio.join(nombre_archivo);
                match std::fs::read_to_string(&ruta) {
                    Ok(fuente) => {
                        info!("📜 [XSD]: Schema cached: {}", nombre_archivo);
                        fuentes.insert(*tipo, fuente);
                    }
                    Err(_) => {
                        debug!("  ⚪ [XSD]: {} absent, fallback armed.", nombre_archivo);
                    }
                }
            }
        }

        Self {
            directorio: directorio.to_path_buf(),
            fuentes,
        }
    }

    /// Directorio configurado (observabilidad).
    pub fn directorio(&self) -> &Path {
        &self.directorio
    }

    /**
     * Valida el XML contra el esquema del tipo, o estructuralmente ante
     * su ausencia.
     *
     * # Performance:
     * CPU-bound; el contexto libxml2 se compila por llamada porque no es
     * compartible entre hilos. La fuente sí proviene de la caché.
     */
    #[instrument(skip(self, xml))]
    pub fn validar(&self, xml: &str, tipo: TipoComprobante) -> ResultadoValidacion {
        match self.fuentes.get(&tipo) {
            Some(fuente) => self.validar_con_esquema(xml, fuente),
            None => {
                debug!("🔎 [XSD]: No schema for {:?}; structural scrutiny engaged.", tipo);
                validar_estructura_basica(xml, tipo)
            }
        }
    }

    fn validar_con_esquema(&self, xml: &str, fuente_xsd: &str) -> ResultadoValidacion {
        let parser = Parser::default();

        let documento = match parser.parse_string(xml) {
            Ok(doc) => doc,
            Err(fallo) => {
                return ResultadoValidacion {
                    es_valido: false,
                    errores: vec![format!("XML mal formado: {}", fallo)],
                    con_esquema: true,
                }
            }
        };

        let mut parser_contexto = SchemaParserContext::from_buffer(fuente_xsd);
        let mut contexto = match SchemaValidationContext::from_parser(&mut parser_contexto) {
            Ok(contexto) => contexto,
            Err(fallos) => {
                warn!("⚠️ [XSD]: Schema compilation collapsed ({} faults).", fallos.len());
                return ResultadoValidacion {
                    es_valido: false,
                    errores: fallos.iter().map(proyectar_error).collect(),
                    con_esquema: true,
                };
            }
        };

        match contexto.validate_document(&documento) {
            Ok(()) => ResultadoValidacion {
                es_valido: true,
                errores: Vec::new(),
                con_esquema: true,
            },
            Err(fallos) => ResultadoValidacion {
                es_valido: false,
                errores: fallos.iter().map(proyectar_error).collect(),
                con_esquema: true,
            },
        }
    }
}

/// Proyecta un error estructurado de libxml2 con su línea de origen.
fn proyectar_error(fallo: &libxml::error::StructuredError) -> String {
    let linea = fallo.line.unwrap_or(0);
    let mensaje = fallo
        .message
        .as_deref()
        .unwrap_or("error de esquema sin mensaje")
        .trim();
    format!("Línea {}: {}", linea, mensaje)
}

/**
 * Verificación estructural mínima cuando no hay esquema físico:
 * raíz esperada, `infoTributaria` con sus campos obligatorios no vacíos
 * y presencia del bloque de información específico del tipo.
 */
pub fn validar_estructura_basica(xml: &str, tipo: TipoComprobante) -> ResultadoValidacion {
    let mut errores = Vec::new();

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut raiz: Option<String> = None;
    let mut pila: Vec<String> = Vec::new();
    let mut campos_vistos: HashMap<String, bool> = HashMap::new();
    let mut info_tributaria_presente = false;
    let mut bloque_tipo_presente = false;
    let mut texto_actual = String::new();

    let bloque_esperado = match tipo {
        TipoComprobante::Factura => "infoFactura",
        TipoComprobante::NotaCredito => "infoNotaCredito",
        TipoComprobante::NotaDebito => "infoNotaDebito",
        TipoComprobante::GuiaRemision => "infoGuiaRemision",
        TipoComprobante::Retencion => "infoCompRetencion",
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(elemento)) => {
                let nombre = String::from_utf8_lossy(elemento.local_name().as_ref()).to_string();
                if raiz.is_none() {
                    raiz = Some(nombre.clone());
                }
                if nombre == "infoTributaria" {
                    info_tributaria_presente = true;
                }
                if nombre == bloque_esperado {
                    bloque_tipo_presente = true;
                }
                pila.push(nombre);
                texto_actual.clear();
            }
            Ok(Event::Text(texto)) => {
                texto_actual = texto.unescape().unwrap_or_default().to_string();
            }
            Ok(Event::Empty(elemento)) => {
                // Un elemento vacío cuenta como campo presente pero sin valor.
                let nombre = String::from_utf8_lossy(elemento.local_name().as_ref()).to_string();
                if pila.last().map(String::as_str) == Some("infoTributaria") {
                    campos_vistos.insert(nombre, false);
                }
            }
            Ok(Event::End(_)) => {
                if let Some(nombre) = pila.pop() {
                    // Registramos los campos hijos directos de infoTributaria.
                    if pila.last().map(String::as_str) == Some("infoTributaria") {
                        campos_vistos.insert(nombre, !texto_actual.trim().is_empty());
                    }
                }
                texto_actual.clear();
            }
            Ok(Event::Eof) => break,
            Err(fallo) => {
                return ResultadoValidacion {
                    es_valido: false,
                    errores: vec![format!("XML mal formado: {}", fallo)],
                    con_esquema: false,
                }
            }
            _ => {}
        }
    }

    match raiz.as_deref() {
        Some(nombre) if nombre == tipo.elemento_raiz() => {}
        Some(nombre) => errores.push(format!("Elemento raíz desconocido: {}", nombre)),
        None => errores.push("Documento vacío".to_string()),
    }

    if !info_tributaria_presente {
        errores.push("Falta elemento infoTributaria".to_string());
    } else {
        for campo in CAMPOS_INFO_TRIBUTARIA {
            match campos_vistos.get(*campo) {
                Some(true) => {}
                _ => errores.push(format!("Falta campo en infoTributaria: {}", campo)),
            }
        }
    }

    if !bloque_tipo_presente {
        errores.push(format!("Falta elemento {}", bloque_esperado));
    }

    ResultadoValidacion {
        es_valido: errores.is_empty(),
        errores,
        con_esquema: false,
    }
}

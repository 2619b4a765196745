// [tests/mirror/apps/pipeline/pipeline_scenarios.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR EXTREMO A EXTREMO DEL PIPELINE (V1.5 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L1-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE LOS ESCENARIOS OFICIALES S1-S4 Y S6
 *
 * El uplink SRI se sustituye por un transporte guionado que devuelve
 * respuestas predefinidas y contabiliza cada llamada; la credencial de
 * firma es un PKCS#12 desechable generado en caliente.
 * =================================================================
 */

use std::collections::VecDeque;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use factel_domain_models::{
    ConfiguracionEmisor, EstadoComprobante, LineaVenta, SeveridadMensaje, TipoContribuyente,
    VentaView,
};
use factel_infra_db::{ComprobanteRepository, LedgerClient, SecuencialRepository};
use factel_infra_sri_ws::{
    EstadoAutorizacion, EstadoRecepcion, RespuestaAutorizacion, RespuestaRecepcion, SriWsError,
    TransporteSri,
};
use factel_infra_xsd::ValidadorXsd;
use factel_pipeline::{OpcionesProcesamiento, PipelineError, ProcesadorComprobante};

// --- TRANSPORTE GUIONADO ---

struct TransporteGuionado {
    recepciones: Mutex<VecDeque<Result<RespuestaRecepcion, SriWsError>>>,
    autorizaciones: Mutex<VecDeque<Result<RespuestaAutorizacion, SriWsError>>>,
    recepciones_ejecutadas: AtomicU32,
    autorizaciones_ejecutadas: AtomicU32,
}

impl TransporteGuionado {
    fn nuevo(
        recepciones: Vec<Result<RespuestaRecepcion, SriWsError>>,
        autorizaciones: Vec<Result<RespuestaAutorizacion, SriWsError>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            recepciones: Mutex::new(recepciones.into()),
            autorizaciones: Mutex::new(autorizaciones.into()),
            recepciones_ejecutadas: AtomicU32::new(0),
            autorizaciones_ejecutadas: AtomicU32::new(0),
        })
    }
}

impl TransporteSri for TransporteGuionado {
    async fn validar_comprobante(
        &self,
        _xml_firmado: &str,
    ) -> Result<RespuestaRecepcion, SriWsError> {
        self.recepciones_ejecutadas.fetch_add(1, Ordering::SeqCst);
        self.recepciones
            .lock()
            .unwrap()
            .pop_front()
            .expect("GUION_AGOTADO: recepción no esperada")
    }

    async fn autorizacion_comprobante(
        &self,
        _clave_acceso: &str,
    ) -> Result<RespuestaAutorizacion, SriWsError> {
        self.autorizaciones_ejecutadas.fetch_add(1, Ordering::SeqCst);
        self.autorizaciones
            .lock()
            .unwrap()
            .pop_front()
            .expect("GUION_AGOTADO: autorización no esperada")
    }

    async fn sondear_autorizacion(
        &self,
        clave_acceso: &str,
    ) -> Result<RespuestaAutorizacion, SriWsError> {
        // Réplica sin pausas de la política real: 6 intentos máximos.
        for _ in 0..6 {
            let respuesta = self.autorizacion_comprobante(clave_acceso).await?;
            if respuesta.estado != EstadoAutorizacion::EnProceso {
                return Ok(respuesta);
            }
        }
        Err(SriWsError::AutorizacionPendiente(clave_acceso.to_string()))
    }
}

// --- RESPUESTAS GUIONADAS ---

fn recibida() -> Result<RespuestaRecepcion, SriWsError> {
    Ok(RespuestaRecepcion {
        estado: EstadoRecepcion::Recibida,
        mensajes: Vec::new(),
    })
}

fn devuelta_con_error() -> Result<RespuestaRecepcion, SriWsError> {
    Ok(RespuestaRecepcion {
        estado: EstadoRecepcion::Devuelta,
        mensajes: vec![factel_domain_models::MensajeSri::error(
            "45",
            "ERROR SECUENCIAL REGISTRADO",
        )],
    })
}

fn autorizado(numero: &str, fecha: &str) -> Result<RespuestaAutorizacion, SriWsError> {
    Ok(RespuestaAutorizacion {
        estado: EstadoAutorizacion::Autorizado,
        numero_autorizacion: numero.to_string(),
        fecha_autorizacion: fecha.to_string(),
        xml_autorizado: String::new(),
        mensajes: Vec::new(),
    })
}

fn en_proceso() -> Result<RespuestaAutorizacion, SriWsError> {
    Ok(RespuestaAutorizacion {
        estado: EstadoAutorizacion::EnProceso,
        numero_autorizacion: String::new(),
        fecha_autorizacion: String::new(),
        xml_autorizado: String::new(),
        mensajes: Vec::new(),
    })
}

// --- CREDENCIALES DESECHABLES ---

const CONTRASENA: &str = "clave-de-prueba";

fn generar_p12(no_antes_unix: i64, no_despues_unix: i64) -> Vec<u8> {
    use openssl::asn1::Asn1Time;
    use openssl::bn::{BigNum, MsbOption};
    use openssl::hash::MessageDigest;
    use openssl::nid::Nid;
    use openssl::pkcs12::Pkcs12;
    use openssl::pkey::PKey;
    use openssl::rsa::Rsa;
    use openssl::x509::{X509Builder, X509NameBuilder};

    let clave = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();

    let mut nombre = X509NameBuilder::new().unwrap();
    nombre.append_entry_by_nid(Nid::COMMONNAME, "FACTEL PRUEBAS").unwrap();
    let nombre = nombre.build();

    let mut constructor = X509Builder::new().unwrap();
    constructor.set_version(2).unwrap();
    let serie = {
        let mut bn = BigNum::new().unwrap();
        bn.rand(64, MsbOption::MAYBE_ZERO, false).unwrap();
        bn.to_asn1_integer().unwrap()
    };
    constructor.set_serial_number(&serie).unwrap();
    constructor.set_subject_name(&nombre).unwrap();
    constructor.set_issuer_name(&nombre).unwrap();
    constructor.set_pubkey(&clave).unwrap();
    constructor
        .set_not_before(Asn1Time::from_unix(no_antes_unix).unwrap().as_ref())
        .unwrap();
    constructor
        .set_not_after(Asn1Time::from_unix(no_despues_unix).unwrap().as_ref())
        .unwrap();
    constructor.sign(&clave, MessageDigest::sha256()).unwrap();
    let certificado = constructor.build();

    Pkcs12::builder()
        .name("factel")
        .pkey(&clave)
        .cert(&certificado)
        .build2(CONTRASENA)
        .unwrap()
        .to_der()
        .unwrap()
}

fn credencial_vigente() -> tempfile::NamedTempFile {
    let ahora = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;
    let mut archivo = tempfile::NamedTempFile::new().unwrap();
    archivo.write_all(&generar_p12(ahora - 86_400, ahora + 365 * 86_400)).unwrap();
    archivo.flush().unwrap();
    archivo
}

fn credencial_vencida() -> tempfile::NamedTempFile {
    // Escenario S4: notAfter = 2020-01-01.
    let mut archivo = tempfile::NamedTempFile::new().unwrap();
    archivo.write_all(&generar_p12(1_546_300_800, 1_577_836_800)).unwrap();
    archivo.flush().unwrap();
    archivo
}

// --- ARMADO DEL BANCO DE PRUEBAS ---

fn emisor_nominal(certificado: &Path) -> ConfiguracionEmisor {
    ConfiguracionEmisor {
        ruc: "1791234567001".to_string(),
        razon_social: "REPUESTOS EC S.A.".to_string(),
        nombre_comercial: None,
        direccion_matriz: "Av. Amazonas N26-12, Quito".to_string(),
        direccion_sucursal: None,
        telefono: Some("022555555".to_string()),
        email: None,
        establecimiento: "001".to_string(),
        punto_emision: "001".to_string(),
        iva_tarifa: dec!(12),
        obligado_contabilidad: true,
        contribuyente_especial: false,
        resolucion_contribuyente: None,
        tipo_contribuyente: TipoContribuyente::Sociedad,
        certificado_path: certificado.display().to_string(),
        certificado_password: CONTRASENA.to_string(),
        ambiente: "1".to_string(),
        tipo_emision: "1".to_string(),
        email_asunto_plantilla: "Comprobante Electrónico - Factura {numero}".to_string(),
    }
}

/// Venta del escenario S1: FIL-001, 2 unidades a 12.00, consumidor final.
fn venta_s1() -> VentaView {
    VentaView::consumidor_final_anonimo(
        NaiveDate::from_ymd_opt(2026, 2, 22).unwrap(),
        vec![LineaVenta {
            codigo: "FIL-001".to_string(),
            descripcion: "Filtro de aceite".to_string(),
            cantidad: dec!(2),
            precio_unitario: dec!(12.00),
            descuento: dec!(0.00),
            subtotal: dec!(24.00),
        }],
        dec!(24.00),
        dec!(0.00),
        dec!(0.00),
        dec!(2.88),
        dec!(26.88),
    )
}

struct BancoDePruebas {
    procesador: ProcesadorComprobante<TransporteGuionado>,
    ledger: LedgerClient,
    comprobantes: Arc<ComprobanteRepository>,
    transporte: Arc<TransporteGuionado>,
    credencial: tempfile::NamedTempFile,
    directorio_pdf: tempfile::TempDir,
}

async fn armar_banco(
    nombre_db: &str,
    credencial: tempfile::NamedTempFile,
    transporte: Arc<TransporteGuionado>,
) -> BancoDePruebas {
    let ledger = LedgerClient::connect(
        &format!("file:{}?mode=memory&cache=shared", nombre_db),
        None,
    )
    .await
    .expect("CRITICAL_FAULT: ledger en memoria inalcanzable");

    let comprobantes = Arc::new(ComprobanteRepository::new(ledger.clone()));
    let secuencias = Arc::new(SecuencialRepository::new(ledger.clone()));
    let validador = Arc::new(ValidadorXsd::new(Path::new("/xsd/inexistente")));
    let directorio_pdf = tempfile::tempdir().unwrap();

    let opciones = OpcionesProcesamiento {
        directorio_pdf: Some(directorio_pdf.path().to_path_buf()),
        ..OpcionesProcesamiento::default()
    };

    let procesador = ProcesadorComprobante::new(
        emisor_nominal(credencial.path()),
        Arc::clone(&comprobantes),
        Arc::clone(&secuencias),
        validador,
        Arc::clone(&transporte),
        None,
        opciones,
    );

    BancoDePruebas {
        procesador,
        ledger,
        comprobantes,
        transporte,
        credencial,
        directorio_pdf,
    }
}

// --- ESCENARIOS OFICIALES ---

#[tokio::test]
async fn escenario_s1_camino_feliz_consumidor_final() {
    println!("\n🧪 [S1]: Camino feliz con consumidor final...");

    let transporte = TransporteGuionado::nuevo(
        vec![recibida()],
        vec![autorizado("N-001", "01/03/2026 10:00:00")],
    );
    let banco = armar_banco("mem_s1", credencial_vigente(), transporte).await;

    let nacido = banco.procesador.crear_desde_venta("V-S1", &venta_s1()).await.unwrap();
    assert_eq!(nacido.secuencial, 1);
    assert_eq!(nacido.numero_formateado(), "001-001-000000001");

    let finalizado = banco.procesador.procesar(&nacido.id).await.unwrap();

    // Veredicto y clave oficial.
    assert_eq!(finalizado.estado, EstadoComprobante::Autorizado);
    assert_eq!(finalizado.clave_acceso.len(), 49);
    assert!(finalizado.clave_acceso.starts_with("220220260117912345670011001001000000001"));
    assert_eq!(finalizado.numero_autorizacion.as_deref(), Some("N-001"));
    assert!(finalizado.autorizacion_integra());

    // Ley 4: el XML autorizado porta la firma con el certificado hoja.
    let xml_autorizado = finalizado.xml_autorizado.as_deref().unwrap();
    assert!(xml_autorizado.contains("<ds:Signature"));
    assert!(xml_autorizado.contains("<ds:X509Certificate>"));

    // Reconciliación: importeTotal = 24.00 + 2.88.
    let xml = finalizado.xml_generado.as_deref().unwrap();
    assert!(xml.contains("<importeTotal>26.88</importeTotal>"));
    assert_eq!(xml.matches("<detalle>").count(), 1);

    // El RIDE aterriza en el sumidero y el correo queda registrado.
    let pdf = banco.directorio_pdf.path().join("001-001-000000001.pdf");
    assert!(pdf.exists(), "RIDE ausente en el sumidero");
    assert!(finalizado.mensajes.iter().any(|m| m.codigo == "RIDE_GENERADO"));
    assert!(finalizado.mensajes.iter().any(|m| m.codigo == "EMAIL_OMITIDO"));

    println!("🏁 [S1]: Autorizado con clave {}.", finalizado.clave_acceso);
}

#[tokio::test]
async fn escenario_s2_devuelto_por_recepcion() {
    println!("\n🧪 [S2]: Comprobante devuelto por recepción...");

    let transporte = TransporteGuionado::nuevo(vec![devuelta_con_error()], vec![]);
    let banco = armar_banco("mem_s2", credencial_vigente(), transporte).await;

    let nacido = banco.procesador.crear_desde_venta("V-S2", &venta_s1()).await.unwrap();
    let finalizado = banco.procesador.procesar(&nacido.id).await.unwrap();

    assert_eq!(finalizado.estado, EstadoComprobante::Devuelto);
    assert!(finalizado.numero_autorizacion.as_deref().unwrap_or("").is_empty());

    // El mensaje estructurado del SRI queda preservado.
    assert!(finalizado
        .mensajes
        .iter()
        .any(|m| m.codigo == "45" && m.severidad == SeveridadMensaje::Error));

    // Sin autorización no hay sondeos ni RIDE despachado.
    assert_eq!(banco.transporte.autorizaciones_ejecutadas.load(Ordering::SeqCst), 0);
    assert!(std::fs::read_dir(banco.directorio_pdf.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn escenario_s3_en_proceso_luego_autorizado() {
    println!("\n🧪 [S3]: EN PROCESO dos veces, luego autorizado...");

    let transporte = TransporteGuionado::nuevo(
        vec![recibida()],
        vec![en_proceso(), en_proceso(), autorizado("N-001", "01/03/2026 10:00:00")],
    );
    let banco = armar_banco("mem_s3", credencial_vigente(), transporte).await;

    let nacido = banco.procesador.crear_desde_venta("V-S3", &venta_s1()).await.unwrap();
    let finalizado = banco.procesador.procesar(&nacido.id).await.unwrap();

    assert_eq!(finalizado.estado, EstadoComprobante::Autorizado);
    assert_eq!(finalizado.numero_autorizacion.as_deref(), Some("N-001"));
    assert_eq!(
        finalizado.fecha_autorizacion.as_deref(),
        Some("01/03/2026 10:00:00")
    );

    // A lo sumo 3 sondeos para drenar el guion.
    let sondeos = banco.transporte.autorizaciones_ejecutadas.load(Ordering::SeqCst);
    assert!(sondeos <= 3, "sondeos excesivos: {}", sondeos);
}

#[tokio::test]
async fn escenario_s4_certificado_vencido() {
    println!("\n🧪 [S4]: Certificado vencido antes de cualquier contacto SRI...");

    let transporte = TransporteGuionado::nuevo(vec![], vec![]);
    let banco = armar_banco("mem_s4", credencial_vencida(), transporte).await;

    let nacido = banco.procesador.crear_desde_venta("V-S4", &venta_s1()).await.unwrap();
    let fallo = banco.procesador.procesar(&nacido.id).await.unwrap_err();

    assert!(matches!(
        fallo,
        PipelineError::Firma(factel_infra_firma::FirmaError::CertificadoVencido(_))
    ));

    // El comprobante colapsa a Fallido SIN tocar la red del SRI.
    let sellado = banco.comprobantes.obtener(&nacido.id).await.unwrap();
    assert_eq!(sellado.estado, EstadoComprobante::Fallido);
    assert_eq!(banco.transporte.recepciones_ejecutadas.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn escenario_s6_reproceso_idempotente() {
    println!("\n🧪 [S6]: Reproceso idempotente tras la autorización...");

    let transporte = TransporteGuionado::nuevo(
        vec![recibida()],
        vec![autorizado("N-001", "01/03/2026 10:00:00")],
    );
    let banco = armar_banco("mem_s6", credencial_vigente(), transporte).await;

    let nacido = banco.procesador.crear_desde_venta("V-S6", &venta_s1()).await.unwrap();
    let primera = banco.procesador.procesar(&nacido.id).await.unwrap();
    assert_eq!(primera.estado, EstadoComprobante::Autorizado);

    let recepciones = banco.transporte.recepciones_ejecutadas.load(Ordering::SeqCst);
    let sondeos = banco.transporte.autorizaciones_ejecutadas.load(Ordering::SeqCst);

    // Segunda invocación: no-op absoluto.
    let segunda = banco.procesador.procesar(&nacido.id).await.unwrap();

    assert_eq!(segunda.estado, primera.estado);
    assert_eq!(segunda.clave_acceso, primera.clave_acceso);
    assert_eq!(segunda.secuencial, primera.secuencial);
    assert_eq!(banco.transporte.recepciones_ejecutadas.load(Ordering::SeqCst), recepciones);
    assert_eq!(banco.transporte.autorizaciones_ejecutadas.load(Ordering::SeqCst), sondeos);
}

#[tokio::test]
async fn escenario_reanudacion_desde_recibido() {
    println!("\n🧪 [EXTRA]: Sondeo agotado deja Recibido; la reanudación sella...");

    // Primera corrida: la red colapsa durante el sondeo.
    let transporte_caido = TransporteGuionado::nuevo(
        vec![recibida()],
        vec![Err(SriWsError::TimeoutSri("enlace severed".to_string()))],
    );
    let banco = armar_banco("mem_reanudacion", credencial_vigente(), transporte_caido).await;

    let nacido = banco.procesador.crear_desde_venta("V-RES", &venta_s1()).await.unwrap();
    let fallo = banco.procesador.procesar(&nacido.id).await.unwrap_err();
    assert!(fallo.es_reintentable());

    let en_espera = banco.comprobantes.obtener(&nacido.id).await.unwrap();
    assert_eq!(en_espera.estado, EstadoComprobante::Recibido);

    // Segunda corrida sobre el mismo Ledger: el sondeo completa el sello.
    let transporte_vivo = TransporteGuionado::nuevo(
        vec![],
        vec![autorizado("N-002", "02/03/2026 09:00:00")],
    );

    let procesador_segundo = ProcesadorComprobante::new(
        emisor_nominal(banco.credencial.path()),
        Arc::clone(&banco.comprobantes),
        Arc::new(SecuencialRepository::new(banco.ledger.clone())),
        Arc::new(ValidadorXsd::new(Path::new("/xsd/inexistente"))),
        Arc::clone(&transporte_vivo),
        None,
        OpcionesProcesamiento::default(),
    );

    let sellado = procesador_segundo.procesar(&nacido.id).await.unwrap();
    assert_eq!(sellado.estado, EstadoComprobante::Autorizado);
    assert_eq!(sellado.numero_autorizacion.as_deref(), Some("N-002"));

    // La recepción NO se repite: la reanudación parte de Recibido.
    assert_eq!(
        transporte_vivo.recepciones_ejecutadas.load(Ordering::SeqCst),
        0
    );
}

// [tests/mirror/libs/infra/db/comprobante_lifecycle.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL CICLO DE VIDA PERSISTIDO (V1.3 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE REHIDRATACIÓN, COHERENCIA Y SELLO TERMINAL
 * =================================================================
 */

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use factel_domain_models::{
    Ambiente, Comprobante, EstadoComprobante, LineaVenta, MensajeSri, TipoComprobante,
    TipoEmision, VentaView,
};
use factel_infra_db::{ComprobanteRepository, DbError, LedgerClient};

fn comprobante_nominal(secuencial: u32) -> Comprobante {
    Comprobante::nuevo(
        "V-0042",
        TipoComprobante::Factura,
        "001",
        "001",
        secuencial,
        Ambiente::Pruebas,
        TipoEmision::Normal,
        NaiveDate::from_ymd_opt(2026, 2, 22).unwrap(),
    )
    .unwrap()
}

fn venta_nominal() -> VentaView {
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

#[tokio::test]
async fn certificar_rehidratacion_completa() {
    println!("\n🗄️  [INICIO]: Auditoría de rehidratación del comprobante...");

    let database_client = LedgerClient::connect("file:mem_vault_hidra?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repositorio = ComprobanteRepository::new(database_client);

    let mut original = comprobante_nominal(7);
    original.clave_acceso = "2202202601179123456700110010010000000071234567818".to_string();
    original.codigo_numerico = "12345678".to_string();
    original.agregar_mensaje(MensajeSri::informativo("GENESIS", "comprobante creado"));

    repositorio.persistir(&original, Some(&venta_nominal())).await.unwrap();

    let rehidratado = repositorio.obtener(&original.id).await.unwrap();
    assert_eq!(rehidratado.venta_ref, "V-0042");
    assert_eq!(rehidratado.secuencial, 7);
    assert_eq!(rehidratado.numero_formateado(), "001-001-000000007");
    assert_eq!(rehidratado.clave_acceso, original.clave_acceso);
    assert_eq!(rehidratado.codigo_numerico, "12345678");
    assert_eq!(rehidratado.estado, EstadoComprobante::Pendiente);
    assert_eq!(rehidratado.mensajes.len(), 1);

    // El snapshot de venta sobrevive para el reprocesamiento.
    let venta = repositorio.obtener_venta(&original.id).await.unwrap().unwrap();
    assert_eq!(venta.detalles.len(), 1);
    assert_eq!(venta.total, dec!(26.88));

    // Búsqueda administrativa por clave de acceso.
    let por_clave = repositorio
        .buscar_por_clave(&original.clave_acceso)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(por_clave.id, original.id);

    println!("🏁 [INFORME]: Rehidratación bit-fiel certificada.");
}

#[tokio::test]
async fn certificar_persistencia_por_transicion() {
    let database_client = LedgerClient::connect("file:mem_vault_transiciones?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repositorio = ComprobanteRepository::new(database_client);

    let mut comprobante = comprobante_nominal(8);
    repositorio.persistir(&comprobante, Some(&venta_nominal())).await.unwrap();

    comprobante.xml_generado = Some("<factura/>".to_string());
    comprobante.transicionar(EstadoComprobante::XmlGenerado).unwrap();
    repositorio.persistir(&comprobante, None).await.unwrap();

    // La recuperación tras colapso relee el último estado estable.
    let reanudado = repositorio.obtener(&comprobante.id).await.unwrap();
    assert_eq!(reanudado.estado, EstadoComprobante::XmlGenerado);
    assert_eq!(reanudado.xml_generado.as_deref(), Some("<factura/>"));

    // El snapshot de venta NO se borra al persistir transiciones sin venta.
    assert!(repositorio.obtener_venta(&comprobante.id).await.unwrap().is_some());
}

#[tokio::test]
async fn certificar_sello_terminal_inmutable() {
    let database_client = LedgerClient::connect("file:mem_vault_sello?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repositorio = ComprobanteRepository::new(database_client);

    let mut comprobante = comprobante_nominal(9);
    comprobante.transicionar(EstadoComprobante::Fallido).unwrap();
    repositorio.persistir(&comprobante, None).await.unwrap();

    // Intento de resurrección: la fila sellada rechaza el cambio de estado.
    let mut intruso = comprobante.clone();
    intruso.estado = EstadoComprobante::Pendiente;
    assert!(matches!(
        repositorio.persistir(&intruso, None).await,
        Err(DbError::EstadoTerminalInmutable(_))
    ));

    // Los mensajes observacionales sí crecen sobre el sello.
    comprobante.agregar_mensaje(MensajeSri::informativo("POST_MORTEM", "análisis forense"));
    repositorio.persistir(&comprobante, None).await.unwrap();

    let sellado = repositorio.obtener(&comprobante.id).await.unwrap();
    assert_eq!(sellado.estado, EstadoComprobante::Fallido);
    assert_eq!(sellado.mensajes.len(), 1);
}

#[tokio::test]
async fn certificar_comprobante_ausente() {
    let database_client = LedgerClient::connect("file:mem_vault_ausente?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repositorio = ComprobanteRepository::new(database_client);

    assert!(matches!(
        repositorio.obtener("fantasma").await,
        Err(DbError::ComprobanteNoEncontrado)
    ));
    assert!(repositorio.buscar_por_clave("0".repeat(49).as_str()).await.unwrap().is_none());
}

// [tests/mirror/libs/infra/db/secuencial_concurrency.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE EXCLUSIVIDAD SECUENCIAL (V1.4 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DEL CANDADO TRANSACCIONAL DEL CONTADOR
 *
 * # Mathematical Proof (Ráfaga Concurrente):
 * Sobre un contador fresco, N llamadores concurrentes deben recibir
 * exactamente el conjunto {1..N}: sin duplicados, sin huecos. El test
 * certifica el semáforo con una ráfaga de 100 tareas Tokio.
 * =================================================================
 */

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;

use factel_infra_db::{DbError, LedgerClient, SecuencialRepository};

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn certificar_rafaga_concurrente_s5() {
    println!("\n🗄️  [INICIO]: Auditoría de exclusividad secuencial (ráfaga de 100)...");

    let database_client = LedgerClient::connect("file:mem_secuencial_s5?mode=memory&cache=shared", None)
        .await
        .expect("CRITICAL_FAULT: Failed to anchor in-memory ledger.");

    let repositorio = Arc::new(SecuencialRepository::new(database_client));

    // Ráfaga: 100 llamadores concurrentes sobre el contador fresco.
    let tareas = (0..100).map(|_| {
        let repositorio = Arc::clone(&repositorio);
        tokio::spawn(async move { repositorio.siguiente("1791234567001", "01").await })
    });

    let resultados = join_all(tareas).await;

    let mut valores_asignados = HashSet::new();
    for resultado in resultados {
        let valor = resultado
            .expect("TASK_FAULT: allocation task collapsed")
            .expect("ALLOC_FAULT: allocator rejected a caller");
        assert!(
            valores_asignados.insert(valor),
            "DUPLICATE_FAULT: secuencial {} asignado dos veces",
            valor
        );
    }

    // El multiconjunto devuelto es exactamente {1..100}.
    let esperados: HashSet<u32> = (1..=100).collect();
    assert_eq!(valores_asignados, esperados);

    println!("🏁 [INFORME]: 100 secuenciales únicos y contiguos certificados.");
}

#[tokio::test]
async fn certificar_independencia_por_tipo_y_emisor() {
    let database_client = LedgerClient::connect("file:mem_secuencial_tipos?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repositorio = SecuencialRepository::new(database_client);

    // Contadores independientes por (emisor, tipo).
    assert_eq!(repositorio.siguiente("1791234567001", "01").await.unwrap(), 1);
    assert_eq!(repositorio.siguiente("1791234567001", "01").await.unwrap(), 2);
    assert_eq!(repositorio.siguiente("1791234567001", "04").await.unwrap(), 1);
    assert_eq!(repositorio.siguiente("0991234567001", "01").await.unwrap(), 1);
}

#[tokio::test]
async fn certificar_reinicio_administrativo_invalida_cache() {
    let database_client = LedgerClient::connect("file:mem_secuencial_reset?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repositorio = SecuencialRepository::new(database_client);

    assert_eq!(repositorio.siguiente("1791234567001", "01").await.unwrap(), 1);
    assert_eq!(repositorio.siguiente("1791234567001", "01").await.unwrap(), 2);

    repositorio.reiniciar("1791234567001", "01", 500).await.unwrap();

    assert_eq!(repositorio.actual("1791234567001", "01").await.unwrap(), 500);
    assert_eq!(repositorio.siguiente("1791234567001", "01").await.unwrap(), 500);

    // Valores ilegales de reinicio.
    assert!(matches!(
        repositorio.reiniciar("1791234567001", "01", 0).await,
        Err(DbError::ReinicioIlegal(0))
    ));
}

#[tokio::test]
async fn certificar_agotamiento_del_techo_legal() {
    let database_client = LedgerClient::connect("file:mem_secuencial_techo?mode=memory&cache=shared", None)
        .await
        .unwrap();
    let repositorio = SecuencialRepository::new(database_client);

    // El último valor legal se asigna; el siguiente colapsa.
    repositorio.reiniciar("1791234567001", "01", 999_999_999).await.unwrap();

    assert_eq!(
        repositorio.siguiente("1791234567001", "01").await.unwrap(),
        999_999_999
    );
    assert!(matches!(
        repositorio.siguiente("1791234567001", "01").await,
        Err(DbError::SecuenciaAgotada { .. })
    ));
}

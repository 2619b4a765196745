// [apps/pipeline/src/procesador.rs]
/*!
 * =================================================================
 * APARATO: PROCESADOR DE COMPROBANTES (V4.5 - STATE MACHINE GUARD)
 * CLASIFICACIÓN: APPLICATION LAYER (ESTRATO L1-APP)
 * RESPONSABILIDAD: SECUENCIACIÓN DE ETAPAS CON PERSISTENCIA ATÓMICA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. TRANSITION PERSISTENCE: Cada etapa exitosa persiste el comprobante
 *    ANTES de invocar la siguiente; un colapso entre etapas se reanuda
 *    releyendo el último estado estable.
 * 2. IDEMPOTENT RESUME: `procesar` sobre un comprobante Autorizado es
 *    un no-op absoluto: ni SRI, ni secuencial, ni clave cambian.
 * 3. OBSERVATIONAL TAIL: RIDE y correo corren solo tras la autorización
 *    y sus fallos únicamente agregan mensajes; jamás degradan el estado.
 * 4. RETRYABLE DISCIPLINE: Los fallos de red dejan el estado intacto y
 *    se reportan como reintentables al llamador.
 *
 * # Mathematical Proof (Crash Recovery):
 * Sea E_n el estado persistido tras la etapa n. Un colapso entre n y
 * n+1 deja el Ledger en E_n; al reanudar, el bucle de despacho salta
 * directamente a la etapa n+1 porque cada rama despacha por estado
 * actual, no por historial. La recuperación es por lo tanto total.
 * =================================================================
 */

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{error, info, instrument, warn};

use factel_core_sri::codigo_numerico_desde_reloj;
use factel_domain_comprobante::{construir_factura, validar_venta};
use factel_domain_models::{
    Ambiente, Comprobante, ConfiguracionEmisor, EstadoComprobante, MensajeSri, TipoComprobante,
    TipoEmision, VentaView,
};
use factel_domain_ride::generar_ride;
use factel_infra_correo::{DatosCorreo, DespachadorCorreo};
use factel_infra_db::{ComprobanteRepository, SecuencialRepository};
use factel_infra_firma::{firmar_comprobante, Certificado};
use factel_infra_sri_ws::{EstadoAutorizacion, EstadoRecepcion, TransporteSri};
use factel_infra_xsd::ValidadorXsd;

use crate::errors::PipelineError;

/// Palancas de etapa del procesamiento (paridad con el flujo original:
/// en ambiente de pruebas el envío al SRI puede omitirse y la corrida
/// se autosella).
#[derive(Debug, Clone)]
pub struct OpcionesProcesamiento {
    pub firmar: bool,
    pub enviar_sri: bool,
    pub enviar_correo: bool,
    /// Plazo global por comprobante; al excederse queda en su último
    /// estado persistido y el fallo es reintentable.
    pub plazo_maximo: Option<Duration>,
    /// Sumidero de PDFs del RIDE.
    pub directorio_pdf: Option<PathBuf>,
}

impl Default for OpcionesProcesamiento {
    fn default() -> Self {
        Self {
            firmar: true,
            enviar_sri: true,
            enviar_correo: true,
            plazo_maximo: None,
            directorio_pdf: None,
        }
    }
}

/// Orquestador de la máquina de estados por comprobante. Genérico sobre
/// el puerto de transporte SRI; los escenarios de prueba inyectan
/// transportes guionados.
pub struct ProcesadorComprobante<T: TransporteSri> {
    emisor: ConfiguracionEmisor,
    comprobantes: Arc<ComprobanteRepository>,
    secuencias: Arc<SecuencialRepository>,
    validador: Arc<ValidadorXsd>,
    transporte: Arc<T>,
    correo: Option<Arc<DespachadorCorreo>>,
    opciones: OpcionesProcesamiento,
}

impl<T: TransporteSri> ProcesadorComprobante<T> {
    pub fn new(
        emisor: ConfiguracionEmisor,
        comprobantes: Arc<ComprobanteRepository>,
        secuencias: Arc<SecuencialRepository>,
        validador: Arc<ValidadorXsd>,
        transporte: Arc<T>,
        correo: Option<Arc<DespachadorCorreo>>,
        opciones: OpcionesProcesamiento,
    ) -> Self {
        Self {
            emisor,
            comprobantes,
            secuencias,
            validador,
            transporte,
            correo,
            opciones,
        }
    }

    /**
     * Crea el comprobante desde una venta comprometida.
     *
     * # Logic:
     * La guardia de frontera corre ANTES de consumir el secuencial: una
     * venta ilegal jamás crea comprobante ni quema numeración. El
     * secuencial asignado no se devuelve ante fallos posteriores (los
     * huecos son legales).
     */
    #[instrument(skip(self, venta))]
    pub async fn crear_desde_venta(
        &self,
        venta_ref: &str,
        venta: &VentaView,
    ) -> Result<Comprobante, PipelineError> {
        validar_venta(venta, &self.emisor)?;

        let secuencial = self
            .secuencias
            .siguiente(&self.emisor.ruc, TipoComprobante::Factura.codigo())
            .await?;

        let tipo_emision = if self.emisor.tipo_emision == "2" {
            TipoEmision::Contingencia
        } else {
            TipoEmision::Normal
        };

        let comprobante = Comprobante::nuevo(
            venta_ref,
            TipoComprobante::Factura,
            &self.emisor.establecimiento,
            &self.emisor.punto_emision,
            secuencial,
            Ambiente::desde_codigo(&self.emisor.ambiente),
            tipo_emision,
            venta.fecha_emision,
        )?;

        self.comprobantes.persistir(&comprobante, Some(venta)).await?;

        info!(
            "🧾 [PIPELINE]: Comprobante [{}] born for venta [{}] with secuencial {}.",
            comprobante.id, venta_ref, secuencial
        );
        Ok(comprobante)
    }

    /**
     * Procesa (o reanuda) el comprobante hasta un estado terminal o un
     * fallo reintentable.
     *
     * # Idempotencia:
     * Sobre un comprobante Autorizado retorna de inmediato sin efectos.
     *
     * # Errors:
     * - `EstadoInvalido` al invocar sobre Devuelto/Fallido.
     * - Fallos reintentables de red con el estado intacto.
     */
    #[instrument(skip(self))]
    pub async fn procesar(&self, comprobante_id: &str) -> Result<Comprobante, PipelineError> {
        let mut comprobante = self.comprobantes.obtener(comprobante_id).await?;

        // No-op idempotente: el sello de autorización es definitivo.
        if comprobante.estado == EstadoComprobante::Autorizado {
            info!("✅ [PIPELINE]: Comprobante [{}] already authorized. No-op.", comprobante_id);
            return Ok(comprobante);
        }

        if comprobante.es_terminal() {
            return Err(PipelineError::EstadoInvalido(format!(
                "comprobante {} sellado en {}",
                comprobante_id,
                comprobante.estado.as_str()
            )));
        }

        let venta = self
            .comprobantes
            .obtener_venta(comprobante_id)
            .await?
            .ok_or_else(|| PipelineError::VentaAusente(comprobante_id.to_string()))?;

        let inicio = Instant::now();

        loop {
            self.verificar_plazo(&comprobante, inicio)?;

            match comprobante.estado {
                EstadoComprobante::Pendiente => {
                    self.etapa_generar_xml(&mut comprobante, &venta).await?
                }
                EstadoComprobante::XmlGenerado => self.etapa_validar(&mut comprobante).await?,
                EstadoComprobante::Validado => self.etapa_firmar(&mut comprobante).await?,
                EstadoComprobante::Firmado => self.etapa_recepcion(&mut comprobante).await?,
                EstadoComprobante::Recibido => self.etapa_autorizacion(&mut comprobante).await?,
                EstadoComprobante::Autorizado => {
                    self.etapa_post_autorizacion(&mut comprobante, &venta).await;
                    break;
                }
                EstadoComprobante::Devuelto | EstadoComprobante::Fallido => break,
            }
        }

        info!(
            "🏁 [PIPELINE]: Comprobante [{}] settled at [{}].",
            comprobante.id,
            comprobante.estado.as_str()
        );
        Ok(comprobante)
    }

    /// Reanudación administrativa; seguro desde cualquier estado no terminal.
    pub async fn reprocesar(&self, comprobante_id: &str) -> Result<Comprobante, PipelineError> {
        self.procesar(comprobante_id).await
    }

    /**
     * Consulta puntual de autorización por clave de acceso. Si el
     * comprobante local sigue en Recibido y el SRI ya lo autorizó, la
     * consulta lo sella (reanudación del sondeo tras reinicios).
     */
    #[instrument(skip(self))]
    pub async fn consultar(
        &self,
        clave_acceso: &str,
    ) -> Result<factel_infra_sri_ws::RespuestaAutorizacion, PipelineError> {
        let respuesta = self.transporte.autorizacion_comprobante(clave_acceso).await?;

        if respuesta.estado == EstadoAutorizacion::Autorizado {
            if let Some(mut local) = self.comprobantes.buscar_por_clave(clave_acceso).await? {
                if local.estado == EstadoComprobante::Recibido {
                    local.numero_autorizacion = Some(respuesta.numero_autorizacion.clone());
                    local.fecha_autorizacion = Some(respuesta.fecha_autorizacion.clone());
                    local.xml_autorizado = if respuesta.xml_autorizado.is_empty() {
                        local.xml_firmado.clone()
                    } else {
                        Some(respuesta.xml_autorizado.clone())
                    };
                    local.transicionar(EstadoComprobante::Autorizado)?;
                    self.comprobantes.persistir(&local, None).await?;
                    info!("🔓 [PIPELINE]: Deferred authorization sealed for clave [{}].", clave_acceso);
                }
            }
        }

        Ok(respuesta)
    }

    // --- ETAPAS ---

    async fn etapa_generar_xml(
        &self,
        comprobante: &mut Comprobante,
        venta: &VentaView,
    ) -> Result<(), PipelineError> {
        // El código numérico se registra una sola vez: la regeneración
        // posterior reutiliza el mismo y la clave es bit-idéntica.
        if comprobante.codigo_numerico.is_empty() {
            comprobante.codigo_numerico = codigo_numerico_desde_reloj();
        }

        match construir_factura(
            venta,
            &self.emisor,
            comprobante.secuencial,
            &comprobante.codigo_numerico,
        ) {
            Ok(factura) => {
                comprobante.clave_acceso = factura.clave_acceso;
                comprobante.xml_generado = Some(factura.xml);
                comprobante.transicionar(EstadoComprobante::XmlGenerado)?;
                self.comprobantes.persistir(comprobante, None).await?;
                Ok(())
            }
            Err(fallo) => {
                self.colapsar(comprobante, "BUILDER", &fallo.to_string()).await?;
                Err(fallo.into())
            }
        }
    }

    async fn etapa_validar(&self, comprobante: &mut Comprobante) -> Result<(), PipelineError> {
        let xml = comprobante
            .xml_generado
            .clone()
            .ok_or_else(|| PipelineError::EstadoInvalido("XmlGenerado sin árbol XML".into()))?;

        let veredicto = self.validador.validar(&xml, comprobante.tipo);

        if !veredicto.con_esquema {
            comprobante.agregar_mensaje(MensajeSri::informativo(
                "XSD_FALLBACK",
                "esquema físico ausente; verificación estructural aplicada",
            ));
        }

        if veredicto.es_valido {
            comprobante.transicionar(EstadoComprobante::Validado)?;
            self.comprobantes.persistir(comprobante, None).await?;
            return Ok(());
        }

        // Política sensible al ambiente: advertencia en pruebas, fatal
        // en producción.
        if comprobante.ambiente == Ambiente::Pruebas {
            warn!(
                "⚠️ [PIPELINE]: XSD validation failed in pruebas ({} faults). Proceeding.",
                veredicto.errores.len()
            );
            for error_xsd in &veredicto.errores {
                comprobante.agregar_mensaje(MensajeSri::advertencia("XSD", error_xsd.clone()));
            }
            comprobante.transicionar(EstadoComprobante::Validado)?;
            self.comprobantes.persistir(comprobante, None).await?;
            Ok(())
        } else {
            let total_fallos = veredicto.errores.len();
            for error_xsd in veredicto.errores {
                comprobante.agregar_mensaje(MensajeSri::error("XSD", error_xsd));
            }
            comprobante.transicionar(EstadoComprobante::Fallido)?;
            self.comprobantes.persistir(comprobante, None).await?;
            Err(PipelineError::ValidacionFallida(total_fallos))
        }
    }

    async fn etapa_firmar(&self, comprobante: &mut Comprobante) -> Result<(), PipelineError> {
        let xml = comprobante
            .xml_generado
            .clone()
            .ok_or_else(|| PipelineError::EstadoInvalido("Validado sin árbol XML".into()))?;

        if !self.opciones.firmar {
            comprobante.agregar_mensaje(MensajeSri::advertencia(
                "FIRMA_OMITIDA",
                "firma digital deshabilitada por palanca de etapa",
            ));
            comprobante.xml_firmado = Some(xml);
            comprobante.transicionar(EstadoComprobante::Firmado)?;
            self.comprobantes.persistir(comprobante, None).await?;
            return Ok(());
        }

        // Recurso de alcance: la credencial vive solo durante esta etapa.
        let resultado = Certificado::cargar(
            PathBuf::from(&self.emisor.certificado_path).as_path(),
            &self.emisor.certificado_password,
        )
        .and_then(|credencial| firmar_comprobante(&xml, &credencial));

        match resultado {
            Ok(xml_firmado) => {
                comprobante.xml_firmado = Some(xml_firmado);
                comprobante.transicionar(EstadoComprobante::Firmado)?;
                self.comprobantes.persistir(comprobante, None).await?;
                Ok(())
            }
            Err(fallo) => {
                self.colapsar(comprobante, "FIRMA", &fallo.to_string()).await?;
                Err(fallo.into())
            }
        }
    }

    async fn etapa_recepcion(&self, comprobante: &mut Comprobante) -> Result<(), PipelineError> {
        let xml_firmado = comprobante
            .xml_firmado
            .clone()
            .ok_or_else(|| PipelineError::EstadoInvalido("Firmado sin XML firmado".into()))?;

        if !self.opciones.enviar_sri {
            return self.autosellar_en_pruebas(comprobante, xml_firmado).await;
        }

        match self.transporte.validar_comprobante(&xml_firmado).await {
            Ok(respuesta) => {
                for mensaje in respuesta.mensajes {
                    comprobante.agregar_mensaje(mensaje);
                }

                match respuesta.estado {
                    EstadoRecepcion::Recibida => {
                        comprobante.transicionar(EstadoComprobante::Recibido)?;
                        self.comprobantes.persistir(comprobante, None).await?;
                        Ok(())
                    }
                    EstadoRecepcion::Devuelta => {
                        warn!("📛 [PIPELINE]: Comprobante [{}] DEVUELTO by reception.", comprobante.id);
                        comprobante.transicionar(EstadoComprobante::Devuelto)?;
                        self.comprobantes.persistir(comprobante, None).await?;
                        Ok(())
                    }
                }
            }
            Err(fallo) if fallo.es_reintentable() => {
                comprobante.agregar_mensaje(MensajeSri::advertencia("SRI_RED", fallo.to_string()));
                self.comprobantes.persistir(comprobante, None).await?;
                Err(fallo.into())
            }
            Err(fallo) => {
                self.colapsar(comprobante, "SRI_RECEPCION", &fallo.to_string()).await?;
                Err(fallo.into())
            }
        }
    }

    async fn etapa_autorizacion(&self, comprobante: &mut Comprobante) -> Result<(), PipelineError> {
        match self.transporte.sondear_autorizacion(&comprobante.clave_acceso).await {
            Ok(respuesta) => {
                for mensaje in respuesta.mensajes.clone() {
                    comprobante.agregar_mensaje(mensaje);
                }

                match respuesta.estado {
                    EstadoAutorizacion::Autorizado => {
                        comprobante.numero_autorizacion = Some(respuesta.numero_autorizacion);
                        comprobante.fecha_autorizacion = Some(respuesta.fecha_autorizacion);
                        comprobante.xml_autorizado = if respuesta.xml_autorizado.is_empty() {
                            comprobante.xml_firmado.clone()
                        } else {
                            Some(respuesta.xml_autorizado)
                        };
                        comprobante.transicionar(EstadoComprobante::Autorizado)?;
                        self.comprobantes.persistir(comprobante, None).await?;
                        Ok(())
                    }
                    EstadoAutorizacion::NoAutorizado => {
                        warn!("📛 [PIPELINE]: Comprobante [{}] NO AUTORIZADO.", comprobante.id);
                        comprobante.transicionar(EstadoComprobante::Devuelto)?;
                        self.comprobantes.persistir(comprobante, None).await?;
                        Ok(())
                    }
                    EstadoAutorizacion::EnProceso => {
                        // El contrato del sondeo agota EN PROCESO; si llega
                        // hasta aquí se trata como pendiente reintentable.
                        comprobante.agregar_mensaje(MensajeSri::advertencia(
                            "SRI_EN_PROCESO",
                            "autorización aún en proceso",
                        ));
                        self.comprobantes.persistir(comprobante, None).await?;
                        Err(PipelineError::Sri(
                            factel_infra_sri_ws::SriWsError::AutorizacionPendiente(
                                comprobante.clave_acceso.clone(),
                            ),
                        ))
                    }
                }
            }
            Err(fallo) if fallo.es_reintentable() => {
                comprobante.agregar_mensaje(MensajeSri::advertencia("SRI_RED", fallo.to_string()));
                self.comprobantes.persistir(comprobante, None).await?;
                Err(fallo.into())
            }
            Err(fallo) => {
                self.colapsar(comprobante, "SRI_AUTORIZACION", &fallo.to_string()).await?;
                Err(fallo.into())
            }
        }
    }

    /// Autosello de pruebas: paridad con el flujo original cuando el
    /// envío al SRI está deshabilitado.
    async fn autosellar_en_pruebas(
        &self,
        comprobante: &mut Comprobante,
        xml_firmado: String,
    ) -> Result<(), PipelineError> {
        if comprobante.ambiente != Ambiente::Pruebas {
            return Err(PipelineError::EstadoInvalido(
                "envío al SRI deshabilitado en ambiente de producción".into(),
            ));
        }

        comprobante.agregar_mensaje(MensajeSri::informativo(
            "AUTOSELLO",
            "autorización simulada: envío al SRI deshabilitado en pruebas",
        ));
        comprobante.transicionar(EstadoComprobante::Recibido)?;
        self.comprobantes.persistir(comprobante, None).await?;

        comprobante.numero_autorizacion = Some(comprobante.clave_acceso.clone());
        comprobante.fecha_autorizacion =
            Some(Local::now().format("%d/%m/%Y %H:%M:%S").to_string());
        comprobante.xml_autorizado = Some(xml_firmado);
        comprobante.transicionar(EstadoComprobante::Autorizado)?;
        self.comprobantes.persistir(comprobante, None).await?;
        Ok(())
    }

    /**
     * Cola observacional posterior a la autorización: RIDE y correo.
     * Sus fallos solo agregan mensajes; el estado no retrocede jamás.
     */
    async fn etapa_post_autorizacion(&self, comprobante: &mut Comprobante, venta: &VentaView) {
        // --- RIDE ---
        let pdf_ride = match generar_ride(comprobante, venta, &self.emisor) {
            Ok(bytes) => {
                comprobante.agregar_mensaje(MensajeSri::informativo(
                    "RIDE_GENERADO",
                    format!("RIDE generado ({} bytes)", bytes.len()),
                ));

                if let Some(directorio) = &self.opciones.directorio_pdf {
                    let destino = directorio.join(format!("{}.pdf", comprobante.numero_formateado()));
                    if let Err(fallo) = std::fs::write(&destino, &bytes) {
                        comprobante.agregar_mensaje(MensajeSri::advertencia(
                            "RIDE_NO_PERSISTIDO",
                            format!("no se pudo escribir {}: {}", destino.display(), fallo),
                        ));
                    }
                }
                Some(bytes)
            }
            Err(fallo) => {
                error!("⚠️ [PIPELINE]: RIDE generation failed: {}", fallo);
                comprobante.agregar_mensaje(MensajeSri::advertencia(
                    "RIDE_NO_GENERADO",
                    fallo.to_string(),
                ));
                None
            }
        };

        // --- CORREO ---
        if self.opciones.enviar_correo {
            self.despachar_correo(comprobante, venta, pdf_ride).await;
        }

        if let Err(fallo) = self.comprobantes.persistir(comprobante, None).await {
            error!("⚠️ [PIPELINE]: Observational trail persistence failed: {}", fallo);
        }
    }

    async fn despachar_correo(
        &self,
        comprobante: &mut Comprobante,
        venta: &VentaView,
        pdf_ride: Option<Vec<u8>>,
    ) {
        let destinatario = venta
            .comprador_email
            .as_deref()
            .filter(|email| !email.is_empty());

        let (despachador, destinatario) = match (&self.correo, destinatario) {
            (Some(despachador), Some(destinatario)) => {
                (Arc::clone(despachador), destinatario.to_string())
            }
            _ => {
                comprobante.agregar_mensaje(MensajeSri::informativo(
                    "EMAIL_OMITIDO",
                    "comprador sin email o SMTP sin configurar",
                ));
                return;
            }
        };

        let numero = comprobante.numero_formateado();
        let xml_autorizado = comprobante
            .xml_autorizado
            .clone()
            .unwrap_or_default()
            .into_bytes();
        let datos = DatosCorreo {
            razon_social: self.emisor.razon_social.clone(),
            cliente: venta.comprador_nombre.clone(),
            total: format!("{:.2}", venta.total),
            fecha: venta.fecha_emision.format("%d/%m/%Y").to_string(),
        };
        let asunto_plantilla = self.emisor.email_asunto_plantilla.clone();

        // El transporte SMTP es bloqueante: se delega al pool de Tokio.
        let resultado = tokio::task::spawn_blocking(move || {
            despachador.enviar_comprobante(
                &destinatario,
                &numero,
                &xml_autorizado,
                pdf_ride.as_deref(),
                &datos,
                &asunto_plantilla,
            )
        })
        .await;

        match resultado {
            Ok(Ok(())) => {
                comprobante.agregar_mensaje(MensajeSri::informativo("EMAIL_ENVIADO", "comprobante despachado al comprador"));
            }
            Ok(Err(fallo)) => {
                error!("⚠️ [PIPELINE]: Email dispatch failed: {}", fallo);
                comprobante.agregar_mensaje(MensajeSri::advertencia("EMAIL_NO_ENVIADO", fallo.to_string()));
            }
            Err(fallo) => {
                error!("⚠️ [PIPELINE]: Email task collapsed: {}", fallo);
                comprobante.agregar_mensaje(MensajeSri::advertencia("EMAIL_NO_ENVIADO", fallo.to_string()));
            }
        }
    }

    // --- AUXILIARES ---

    fn verificar_plazo(
        &self,
        comprobante: &Comprobante,
        inicio: Instant,
    ) -> Result<(), PipelineError> {
        if let Some(plazo) = self.opciones.plazo_maximo {
            if inicio.elapsed() > plazo {
                warn!(
                    "⏱️ [PIPELINE]: Deadline exceeded for [{}] at state [{}].",
                    comprobante.id,
                    comprobante.estado.as_str()
                );
                return Err(PipelineError::PlazoExcedido(comprobante.id.clone()));
            }
        }
        Ok(())
    }

    /// Colapso terminal de etapa: rastro + transición a Fallido + sello.
    async fn colapsar(
        &self,
        comprobante: &mut Comprobante,
        codigo: &str,
        detalle: &str,
    ) -> Result<(), PipelineError> {
        error!("❌ [PIPELINE]: Stage collapse [{}]: {}", codigo, detalle);
        comprobante.agregar_mensaje(MensajeSri::error(codigo, detalle.to_string()));
        comprobante.transicionar(EstadoComprobante::Fallido)?;
        self.comprobantes.persistir(comprobante, None).await?;
        Ok(())
    }
}

// [apps/control-plane/src/handlers/files.rs]
/*!
 * =================================================================
 * APARATO: DISTRIBUTABLE FILE GATEWAY (V9.0 - RANGE READY)
 * CLASIFICACIÓN: API HANDLER (ESTRATO L4)
 * RESPONSABILIDAD: SERVIDO DE HASHLISTS, DICCIONARIOS, REGLAS Y BINARIOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. RANGE SUPPORT: Delegación en ServeFile (tower-http) para
 *    peticiones parciales de archivos masivos.
 * 2. INTEGRITY SEAL: El ETag transporta la huella de contenido
 *    registrada, permitiendo al agente verificar la descarga.
 * 3. PATH SHIELD: Guardia contra path traversal antes de tocar disco.
 * =================================================================
 */

use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use kraken_domain_models::FileKind;
use std::path::PathBuf;
use tower::util::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{debug, instrument, warn};

pub struct FileGatewayHandler;

impl FileGatewayHandler {
    /**
     * Endpoint: GET /files/:kind/:category/:filename
     * Sirve el archivo crudo con Content-Length, ETag y soporte Range.
     */
    #[instrument(skip(application_state, request))]
    pub async fn download_distributable(
        State(application_state): State<AppState>,
        Path((kind_segment, category, file_name)): Path<(String, String, String)>,
        request: Request,
    ) -> Response {
        // Guardia de seguridad de ruta (path traversal)
        if kind_segment.contains("..") || category.contains("..") || file_name.contains("..") {
            return StatusCode::FORBIDDEN.into_response();
        }

        let file_kind = match FileKind::from_path_segment(&kind_segment) {
            Some(kind) => kind,
            None => return StatusCode::NOT_FOUND.into_response(),
        };

        let stored_file = match application_state
            .resource_repository
            .resolve_served_file(file_kind, &file_name)
            .await
        {
            Ok(metadata) => metadata,
            Err(_) => {
                debug!(
                    "❓ [GATEWAY_MISS]: {}/{}/{} not registered.",
                    kind_segment, category, file_name
                );
                return StatusCode::NOT_FOUND.into_response();
            }
        };

        let registered_path = PathBuf::from(&stored_file.file_path);
        let absolute_path = if registered_path.is_absolute() {
            registered_path
        } else {
            application_state.config.data_dir.join(registered_path)
        };

        match ServeFile::new(&absolute_path).oneshot(request).await {
            Ok(served_response) => {
                let mut response = served_response.map(Body::new);

                if let Ok(etag_value) =
                    HeaderValue::from_str(&format!("\"{}\"", stored_file.content_hash))
                {
                    response.headers_mut().insert(header::ETAG, etag_value);
                }
                response
            }
            Err(serving_fault) => {
                warn!(
                    "❌ [GATEWAY_FAULT]: {} unreadable: {}",
                    absolute_path.display(),
                    serving_fault
                );
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

use actix_files::{Files, NamedFile};
use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError, web};
use futures::{StreamExt, TryStreamExt};
use log::{error, info};
use shared::{
    CatalogResponse, DiagnosisResponse, ErrorResponse, PlantSpecies, SessionId, display_name,
};
use std::path::PathBuf;

use crate::classifier::ClassCatalog;
use crate::diagnosis::{DiagnoseError, Orchestrator, SessionResult, SessionStore};
use crate::guide::{ReferenceLibrary, TreatmentGuide};
use crate::imaging::{Image, ImageError, decode_upload};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No image uploaded")]
    MissingImage,
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error(transparent)]
    Diagnose(#[from] DiagnoseError),
    #[error("{0}")]
    NotFound(String),
    #[error("Malformed upload: {0}")]
    Multipart(String),
    #[error("Form field {0} exceeds {1} bytes")]
    FieldTooLarge(String, usize),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingImage | ApiError::BadRequest(_) | ApiError::Multipart(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Image(ImageError::TooLarge(..)) | ApiError::FieldTooLarge(..) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            ApiError::Image(ImageError::UnsupportedFormat) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Image(ImageError::Empty | ImageError::Decode(_)) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Image(_) | ApiError::Diagnose(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

/// Upload limit shared with the handlers.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_bytes: usize,
}

pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/diagnose").route(web::post().to(diagnose)))
        .service(
            web::resource("/api/sessions/{session_id}")
                .route(web::get().to(get_session))
                .route(web::delete().to(reset_session)),
        )
        .service(
            web::resource("/api/sessions/{session_id}/images/{kind}")
                .route(web::get().to(session_image)),
        )
        .service(web::resource("/api/reference/{label}").route(web::get().to(reference_image)))
        .service(web::resource("/api/catalog").route(web::get().to(catalog)));
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, frontend_dir: PathBuf) {
    configure_api(cfg);
    cfg.service(Files::new("/", frontend_dir).index_file("index.html"));
}

const MAX_TEXT_FIELD_BYTES: usize = 1024;

struct DiagnoseForm {
    image: Option<Vec<u8>>,
    use_enhancement: bool,
    session_id: Option<SessionId>,
}

fn parse_flag(value: &str) -> Result<bool, ApiError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "1" | "yes" => Ok(true),
        "false" | "off" | "0" | "no" | "" => Ok(false),
        other => Err(ApiError::BadRequest(format!(
            "Invalid use_enhancement value: {}",
            other
        ))),
    }
}

fn parse_session_id(value: &str) -> Result<SessionId, ApiError> {
    SessionId::parse(value)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid session id: {}", value.trim())))
}

async fn read_form(mut payload: Multipart, limits: UploadLimits) -> Result<DiagnoseForm, ApiError> {
    let mut form = DiagnoseForm {
        image: None,
        use_enhancement: false,
        session_id: None,
    };

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| ApiError::Multipart(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let limit = match name.as_str() {
            "image" => limits.max_bytes,
            "use_enhancement" | "session_id" => MAX_TEXT_FIELD_BYTES,
            other => {
                log::debug!("Ignoring unknown form field {}", other);
                while let Some(chunk) = field.next().await {
                    chunk.map_err(|e| ApiError::Multipart(e.to_string()))?;
                }
                continue;
            }
        };

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| ApiError::Multipart(e.to_string()))?;
            data.extend_from_slice(&chunk);
            if data.len() > limit {
                return Err(if name == "image" {
                    ImageError::TooLarge(data.len(), limit).into()
                } else {
                    ApiError::FieldTooLarge(name, limit)
                });
            }
        }

        match name.as_str() {
            "image" => {
                if form.image.is_some() {
                    return Err(ApiError::BadRequest("Only one image per request".into()));
                }
                form.image = Some(data);
            }
            "use_enhancement" => {
                form.use_enhancement = parse_flag(&String::from_utf8_lossy(&data))?;
            }
            "session_id" => {
                let value = String::from_utf8_lossy(&data);
                if !value.trim().is_empty() {
                    form.session_id = Some(parse_session_id(&value)?);
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

pub fn diagnosis_response(
    result: &SessionResult,
    references: &ReferenceLibrary,
) -> DiagnosisResponse {
    let final_diagnosis = result.final_diagnosis().clone();
    let label = final_diagnosis.label.clone();
    let healthy = final_diagnosis.is_healthy();
    let treatment = if healthy {
        Vec::new()
    } else {
        TreatmentGuide::steps(&label)
            .iter()
            .map(|step| step.to_string())
            .collect()
    };
    let id = result.id();

    DiagnosisResponse {
        session_id: id,
        original: result.original().clone(),
        enhanced: result.enhanced().cloned(),
        outcome: result.outcome(),
        warning: result.warning().cloned(),
        healthy,
        display_name: display_name(&label),
        species: PlantSpecies::from_label(&label),
        treatment,
        reference_url: references
            .lookup(&label)
            .map(|_| format!("/api/reference/{}", label)),
        original_image_url: format!("/api/sessions/{}/images/original", id),
        enhanced_image_url: result
            .enhanced_image()
            .map(|_| format!("/api/sessions/{}/images/enhanced", id)),
        final_diagnosis,
    }
}

async fn diagnose(
    orchestrator: web::Data<Orchestrator>,
    store: web::Data<SessionStore>,
    references: web::Data<ReferenceLibrary>,
    limits: web::Data<UploadLimits>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let limits = *limits.get_ref();
    let form = read_form(payload, limits).await?;
    let bytes = form.image.ok_or(ApiError::MissingImage)?;
    let image = web::block(move || decode_upload(&bytes, limits.max_bytes))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    let id = form.session_id.unwrap_or_default();
    info!(
        "Session {}: diagnosing {}x{} image (enhancement {})",
        id,
        image.width(),
        image.height(),
        if form.use_enhancement { "on" } else { "off" }
    );

    let result = orchestrator
        .diagnose_as(id, image, form.use_enhancement)
        .await
        .map_err(|e| {
            error!("Session {}: {}", id, e);
            e
        })?;
    let result = store.replace(result);
    Ok(HttpResponse::Ok().json(diagnosis_response(&result, &references)))
}

fn stored(store: &SessionStore, raw_id: &str) -> Result<std::sync::Arc<SessionResult>, ApiError> {
    let id = parse_session_id(raw_id)?;
    store
        .get(&id)
        .ok_or_else(|| ApiError::NotFound(format!("No analysis for session {}", id)))
}

async fn get_session(
    store: web::Data<SessionStore>,
    references: web::Data<ReferenceLibrary>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let result = stored(&store, &path.into_inner())?;
    Ok(HttpResponse::Ok().json(diagnosis_response(&result, &references)))
}

async fn reset_session(
    store: web::Data<SessionStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_session_id(&path.into_inner())?;
    if store.reset(&id) {
        info!("Session {}: reset", id);
    }
    Ok(HttpResponse::NoContent().finish())
}

async fn session_image(
    store: web::Data<SessionStore>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (raw_id, kind) = path.into_inner();
    let result = stored(&store, &raw_id)?;
    let image: Image = match kind.as_str() {
        "original" => result.input().clone(),
        "enhanced" => result
            .enhanced_image()
            .cloned()
            .ok_or_else(|| ApiError::NotFound("No enhanced image for this session".into()))?,
        other => return Err(ApiError::NotFound(format!("Unknown image kind: {}", other))),
    };

    let png = web::block(move || image.to_png())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().content_type("image/png").body(png))
}

async fn reference_image(
    references: web::Data<ReferenceLibrary>,
    path: web::Path<String>,
) -> Result<NamedFile, ApiError> {
    let label = path.into_inner();
    let file = references
        .lookup(&label)
        .ok_or_else(|| ApiError::NotFound("No healthy reference image available".into()))?;
    NamedFile::open_async(&file)
        .await
        .map_err(|e| ApiError::Internal(format!("{}: {}", file.display(), e)))
}

async fn catalog(catalog: web::Data<ClassCatalog>) -> HttpResponse {
    HttpResponse::Ok().json(CatalogResponse {
        labels: catalog.labels().to_vec(),
    })
}

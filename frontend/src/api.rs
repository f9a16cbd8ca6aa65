use gloo_file::File as GlooFile;
use gloo_net::http::{Request, Response};
use shared::{DiagnosisResponse, ErrorResponse, SessionId};
use web_sys::FormData;

async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) => err.error,
        Err(_) => format!("Server error: {} - {}", status, body),
    }
}

/// Upload one image for analysis. Passing the current session id replaces
/// that session's previous result.
pub async fn diagnose(
    file: &GlooFile,
    use_enhancement: bool,
    session_id: Option<SessionId>,
) -> Result<DiagnosisResponse, String> {
    let form_data = FormData::new().map_err(|e| format!("Failed to build form: {:?}", e))?;
    form_data
        .append_with_blob_and_filename("image", file.as_ref(), &file.name())
        .map_err(|e| format!("Failed to attach image: {:?}", e))?;
    form_data
        .append_with_str("use_enhancement", if use_enhancement { "true" } else { "false" })
        .map_err(|e| format!("Failed to build form: {:?}", e))?;
    if let Some(id) = session_id {
        form_data
            .append_with_str("session_id", &id.to_string())
            .map_err(|e| format!("Failed to build form: {:?}", e))?;
    }

    let response = Request::post("/api/diagnose")
        .body(form_data)
        .map_err(|e| format!("Failed to build request: {}", e))?
        .send()
        .await
        .map_err(|e| format!("Network error: {}", e))?;

    if !response.ok() {
        return Err(error_message(response).await);
    }
    response
        .json::<DiagnosisResponse>()
        .await
        .map_err(|e| format!("Failed to parse response: {}", e))
}

pub async fn reset_session(session_id: SessionId) -> Result<(), String> {
    let response = Request::delete(&format!("/api/sessions/{}", session_id))
        .send()
        .await
        .map_err(|e| format!("Network error: {}", e))?;
    if response.ok() {
        Ok(())
    } else {
        Err(error_message(response).await)
    }
}

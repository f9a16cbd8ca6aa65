use super::super::{Model, Msg};
use crate::api;
use crate::components::utils::first_image_file;
use gloo_console::error;
use gloo_file::{File as GlooFile, ObjectUrl};
use shared::DiagnosisResponse;
use wasm_bindgen_futures::spawn_local;
use web_sys::{ClipboardEvent, DragEvent, FileList};
use yew::prelude::*;

pub fn handle_file_selected(model: &mut Model, file: GlooFile) -> bool {
    // A new upload invalidates whatever was shown for the previous one.
    model.requests.invalidate();
    model.preview_url = Some(ObjectUrl::from(file.clone()));
    model.file = Some(file);
    model.result = None;
    model.error = None;
    model.loading = false;
    true
}

pub fn handle_analyze(model: &mut Model, ctx: &Context<Model>) -> bool {
    let Some(file) = model.file.clone() else {
        ctx.link()
            .send_message(Msg::SetError(Some("Please upload an image first.".into())));
        return false;
    };

    let request = model.requests.begin();
    model.loading = true;
    model.error = None;
    let use_enhancement = model.use_enhancement;
    let session_id = model.session_id;
    let link = ctx.link().clone();

    spawn_local(async move {
        match api::diagnose(&file, use_enhancement, session_id).await {
            Ok(response) => link.send_message(Msg::DiagnosisReady(request, response)),
            Err(e) => {
                error!(format!("Analysis failed: {}", e));
                link.send_message(Msg::AnalysisFailed(request, e))
            }
        }
    });
    true
}

pub fn handle_diagnosis(model: &mut Model, request: u64, response: DiagnosisResponse) -> bool {
    if !model.requests.is_current(request) {
        log::info!("Discarding stale diagnosis for session {}", response.session_id);
        // The server already stored it; nothing on screen refers to it any more.
        if model.session_id != Some(response.session_id) {
            let session_id = response.session_id;
            spawn_local(async move {
                if let Err(e) = api::reset_session(session_id).await {
                    log::warn!("Failed to discard stale session {}: {}", session_id, e);
                }
            });
        }
        return false;
    }

    log::info!(
        "Diagnosis {} ({:.1}%), outcome {}",
        response.final_diagnosis.label,
        response.final_diagnosis.confidence_percent(),
        response.outcome
    );
    model.session_id = Some(response.session_id);
    model.result = Some(response);
    model.loading = false;
    true
}

pub fn handle_analysis_failed(model: &mut Model, request: u64, error: String) -> bool {
    if !model.requests.is_current(request) {
        return false;
    }
    model.error = Some(error);
    model.loading = false;
    true
}

pub fn handle_reset(model: &mut Model, ctx: &Context<Model>) -> bool {
    model.requests.invalidate();
    model.loading = false;
    model.file = None;
    model.preview_url = None;
    model.result = None;
    model.error = None;

    if let Some(session_id) = model.session_id.take() {
        model.loading = true;
        let link = ctx.link().clone();
        spawn_local(async move {
            match api::reset_session(session_id).await {
                Ok(()) => link.send_message(Msg::ResetDone),
                Err(e) => link.send_message(Msg::SetError(Some(e))),
            }
        });
    }
    true
}

pub fn handle_drop(ctx: &Context<Model>, model: &mut Model, event: DragEvent) -> bool {
    event.prevent_default();
    model.is_dragging = false;

    if let Some(data_transfer) = event.data_transfer() {
        if let Some(file_list) = data_transfer.files() {
            process_file_list(ctx, file_list);
        }
    }

    true
}

pub fn handle_paste(ctx: &Context<Model>, event: ClipboardEvent) -> bool {
    if let Some(data_transfer) = event.clipboard_data() {
        if let Some(file_list) = data_transfer.files() {
            if file_list.length() > 0 {
                event.prevent_default();
                process_file_list(ctx, file_list);
                return true;
            }
        }
    }
    false
}

fn process_file_list(ctx: &Context<Model>, file_list: FileList) {
    match first_image_file(&file_list) {
        Some(file) => ctx.link().send_message(Msg::FileSelected(file)),
        None => ctx.link().send_message(Msg::SetError(Some(
            "Please upload a JPG or PNG image.".into(),
        ))),
    }
}

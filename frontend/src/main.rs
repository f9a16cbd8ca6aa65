mod api;
mod components;

use components::handlers;
use components::header::render_header;
use components::preview_area::render_preview_area;
use components::results::render_results;
use components::upload_section::render_upload_section;
use components::utils::{RequestTracker, render_error_message};
use gloo_events::EventListener;
use gloo_file::{File as GlooFile, ObjectUrl};
use shared::{DiagnosisResponse, SessionId};
use wasm_bindgen::JsCast;
use web_sys::{ClipboardEvent, DragEvent};
use yew::prelude::*;

pub enum Msg {
    // File operations
    FileSelected(GlooFile),

    // Analysis operations
    SetEnhancement(bool),
    Analyze,
    DiagnosisReady(u64, DiagnosisResponse),
    AnalysisFailed(u64, String),
    Reset,
    ResetDone,

    // UI states
    SetError(Option<String>),
    SetDragging(bool),

    // Input events
    HandleDrop(DragEvent),
    HandlePaste(ClipboardEvent),
}

pub struct Model {
    pub file: Option<GlooFile>,
    pub preview_url: Option<ObjectUrl>,
    pub use_enhancement: bool,
    pub session_id: Option<SessionId>,
    pub result: Option<DiagnosisResponse>,
    pub loading: bool,
    pub error: Option<String>,
    pub is_dragging: bool,
    pub requests: RequestTracker,
    paste_listener: Option<EventListener>,
}

impl Component for Model {
    type Message = Msg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        let mut model = Self {
            file: None,
            preview_url: None,
            use_enhancement: false,
            session_id: None,
            result: None,
            loading: false,
            error: None,
            is_dragging: false,
            requests: RequestTracker::default(),
            paste_listener: None,
        };

        let link = ctx.link().clone();
        if let Some(window) = web_sys::window() {
            let listener = EventListener::new(&window, "paste", move |event| {
                if let Some(clipboard_event) = event.dyn_ref::<ClipboardEvent>() {
                    link.send_message(Msg::HandlePaste(clipboard_event.clone()));
                }
            });
            model.paste_listener = Some(listener);
        } else {
            log::error!("No global window, paste upload disabled");
        }

        model
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::FileSelected(file) => handlers::handle_file_selected(self, file),

            Msg::SetEnhancement(enabled) => {
                self.use_enhancement = enabled;
                true
            }
            Msg::Analyze => handlers::handle_analyze(self, ctx),
            Msg::DiagnosisReady(request, response) => {
                handlers::handle_diagnosis(self, request, response)
            }
            Msg::AnalysisFailed(request, error) => {
                handlers::handle_analysis_failed(self, request, error)
            }
            Msg::Reset => handlers::handle_reset(self, ctx),
            Msg::ResetDone => {
                self.loading = false;
                true
            }

            Msg::SetError(error) => {
                self.error = error;
                self.loading = false;
                true
            }
            Msg::SetDragging(is_dragging) => {
                self.is_dragging = is_dragging;
                true
            }

            Msg::HandleDrop(event) => handlers::handle_drop(ctx, self, event),
            Msg::HandlePaste(event) => handlers::handle_paste(ctx, event),
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        html! {
            <div class="container">
                { render_header() }

                <main class="main-content">
                { render_upload_section(self, ctx) }
                { render_preview_area(self, ctx) }
                { render_error_message(self) }
                { render_results(self) }
                </main>

                <footer class="app-footer">
                    <p>{"Plant Disease Detection | Fullstack Rust WASM"}</p>
                </footer>
            </div>
        }
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("App starting...");
    yew::Renderer::<Model>::new().render();
}

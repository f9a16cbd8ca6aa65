use yew::prelude::*;

/// Renders the application header
pub fn render_header() -> Html {
    html! {
        <header class="app-header">
            <h1><i class="fa-solid fa-leaf"></i> {" Plant Disease Detection"}</h1>
            <p class="subtitle">{"Upload a leaf photo to identify diseases and get treatment advice"}</p>
        </header>
    }
}

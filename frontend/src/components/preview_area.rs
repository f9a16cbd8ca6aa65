use super::super::{Model, Msg};
use super::utils::debounce;
use yew::prelude::*;

pub fn render_preview_area(model: &Model, ctx: &Context<Model>) -> Html {
    let Some(file) = &model.file else {
        return html! {};
    };

    let link = ctx.link().clone();

    html! {
        <div id="preview-container">
            {
                match &model.preview_url {
                    Some(url) => html! {
                        <img id="actual-image-preview"
                            src={url.to_string()}
                            alt={file.name()}
                            style="max-width:100%; max-height: 400px; object-fit: contain; margin-bottom: 10px;" />
                    },
                    None => html! {
                        <div class="preview-placeholder">
                            <p>{"Preview unavailable"}</p>
                        </div>
                    },
                }
            }
            <div class="button-container">
                <button
                    id="reset-btn"
                    class="analyze-btn"
                    style="background-color: var(--clear-color);"
                    disabled={model.loading}
                    onclick={debounce(300, {
                        let link = link.clone();
                        move || link.send_message(Msg::Reset)
                    })}
                >
                    <i class="fa-solid fa-rotate-left"></i>{" Analyze Another Image"}
                </button>
                <button
                    class="analyze-btn"
                    onclick={debounce(300, {
                        let link = link.clone();
                        move || link.send_message(Msg::Analyze)
                    })}
                    disabled={model.loading}
                >
                    { render_analyze_button_content(model, &file.name()) }
                </button>
            </div>
        </div>
    }
}

fn render_analyze_button_content(model: &Model, filename: &str) -> Html {
    if model.loading {
        let label = if model.use_enhancement {
            " Enhancing and analyzing..."
        } else {
            " Analyzing..."
        };
        html! { <><i class="fa-solid fa-spinner fa-spin"></i>{ label }</> }
    } else {
        let display_name = if filename.chars().count() > 20 {
            format!("{}...", filename.chars().take(17).collect::<String>())
        } else {
            filename.to_string()
        };

        html! { <><i class="fa-solid fa-magnifying-glass"></i>{ format!(" Analyze \"{}\"", display_name) }</> }
    }
}

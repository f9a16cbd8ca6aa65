use super::super::Model;
use shared::{DiagnosisResponse, SelectionOutcome};
use yew::prelude::*;

pub fn render_results(model: &Model) -> Html {
    match &model.result {
        Some(result) => html! {
            <div class="results-container">
                { render_enhancement_banner(result) }
                <div class="section-container">
                    <div class="section-title">{"Detection Results"}</div>
                </div>
                {
                    if result.healthy {
                        render_healthy(result)
                    } else {
                        html! {
                            <>
                                { render_disease(result) }
                                { render_treatment(result) }
                                { render_comparison(result) }
                            </>
                        }
                    }
                }
            </div>
        },
        None => html! {},
    }
}

fn percent(confidence: f32) -> String {
    format!("{:.1}%", confidence * 100.0)
}

fn render_enhancement_banner(result: &DiagnosisResponse) -> Html {
    match (result.outcome, &result.enhanced) {
        (SelectionOutcome::Enhanced, Some(enhanced)) => html! {
            <div class="enhancement-comparison">
                <div class="comparison-images">
                    <figure>
                        <img src={result.original_image_url.clone()} alt="Original" />
                        <figcaption>{"Original Image"}</figcaption>
                    </figure>
                    {
                        match &result.enhanced_image_url {
                            Some(url) => html! {
                                <figure>
                                    <img src={url.clone()} alt="Enhanced" />
                                    <figcaption>{"Enhanced Image (4x)"}</figcaption>
                                </figure>
                            },
                            None => html! {},
                        }
                    }
                </div>
                <div class="success-message">
                    { format!(
                        "Enhancement improved detection! Using enhanced result (Confidence: {} vs Original: {})",
                        percent(enhanced.confidence),
                        percent(result.original.confidence)
                    ) }
                </div>
            </div>
        },
        (SelectionOutcome::Original, Some(_)) => html! {
            <div class="info-message">
                { format!(
                    "Original image provided better results. Using original image analysis (Confidence: {})",
                    percent(result.original.confidence)
                ) }
            </div>
        },
        (SelectionOutcome::EnhancementFailed, _) => {
            let reason = result
                .warning
                .as_ref()
                .map(|w| w.message.as_str())
                .unwrap_or("unknown error");
            html! {
                <div class="warning-message">
                    <i class="fa-solid fa-triangle-exclamation"></i>
                    { format!(" Enhancement failed: {}. Using original image.", reason) }
                </div>
            }
        }
        _ => html! {},
    }
}

fn render_confidence(confidence: f32) -> Html {
    html! {
        <div class="confidence-meter">
            <div class="meter-label">{"Confidence Score"}</div>
            <div class="meter">
                <div class="meter-fill" style={format!("width: {}%", confidence * 100.0)}></div>
            </div>
            <div class="meter-value">{ percent(confidence) }</div>
        </div>
    }
}

fn render_disease(result: &DiagnosisResponse) -> Html {
    html! {
        <div class="result-box">
            <div class="result-header">
                <div>
                    <div class="result-label">{"Detected condition"}</div>
                    <div class="result-disease-name">{ &result.display_name }</div>
                </div>
                <div class="result-badge">{"Disease Detected"}</div>
            </div>
            { render_confidence(result.final_diagnosis.confidence) }
        </div>
    }
}

fn render_healthy(result: &DiagnosisResponse) -> Html {
    html! {
        <>
            <div class="result-box healthy">
                <div class="result-header">
                    <div>
                        <div class="result-label healthy">{"Plant Status"}</div>
                        <div class="result-disease-name">{"Plant is Healthy!"}</div>
                    </div>
                    <div class="result-badge healthy">{"Healthy"}</div>
                </div>
                { render_confidence(result.final_diagnosis.confidence) }
            </div>
            <div class="success-message">
                {"Great news! Your plant appears to be healthy. Continue with regular care and monitoring."}
            </div>
        </>
    }
}

fn render_treatment(result: &DiagnosisResponse) -> Html {
    if result.treatment.is_empty() {
        return html! {};
    }

    html! {
        <div class="treatment-box">
            <div class="treatment-header">
                <i class="fa-solid fa-seedling"></i>
                <div class="treatment-title">{"Treatment Recommendations"}</div>
            </div>
            { for result.treatment.iter().enumerate().map(|(i, step)| html! {
                <div class="treatment-step">
                    <div class="treatment-step-number">{ i + 1 }</div>
                    <div class="treatment-step-text">{ step }</div>
                </div>
            })}
        </div>
    }
}

fn render_comparison(result: &DiagnosisResponse) -> Html {
    html! {
        <div class="visual-comparison">
            <figure>
                <img src={result.original_image_url.clone()} alt="Your plant" />
                <figcaption>{"Your Plant (Diseased)"}</figcaption>
            </figure>
            {
                match &result.reference_url {
                    Some(url) => html! {
                        <figure>
                            <img src={url.clone()} alt="Healthy reference" />
                            <figcaption>{"Healthy Reference"}</figcaption>
                        </figure>
                    },
                    None => html! {
                        <div class="info-message">{"No healthy reference image available"}</div>
                    },
                }
            }
        </div>
    }
}

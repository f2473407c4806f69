use crate::inference::{InferenceContext, Label};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::{Form, Router};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct EmailForm {
    #[serde(default)]
    pub email_input: String,
}

/// What the template renders after a POST. `score` is absent when the
/// pipeline was not invoked (empty input) or failed.
#[derive(Debug, Clone, PartialEq)]
pub struct FormResult {
    pub label: String,
    pub score: Option<String>,
    pub is_phishing: bool,
}

pub fn router(context: Arc<InferenceContext>) -> Router {
    Router::new()
        .route("/", get(show_form).post(classify_form))
        .with_state(context)
}

pub async fn serve(listen: &str, context: Arc<InferenceContext>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("binding to {listen}"))?;
    log::info!("phishscan web form listening on http://{listen}/");
    axum::serve(listener, router(context))
        .await
        .context("serving http")?;
    Ok(())
}

async fn show_form() -> Html<String> {
    Html(render_page(None, ""))
}

async fn classify_form(
    State(context): State<Arc<InferenceContext>>,
    Form(form): Form<EmailForm>,
) -> Html<String> {
    let result = evaluate(&context, &form.email_input);
    Html(render_page(Some(&result), &form.email_input))
}

/// The outermost error boundary: empty input short-circuits to a prompt
/// without touching the pipeline, and any prediction failure degrades to
/// a label string carrying the error text. Either way the request
/// renders normally.
pub fn evaluate(context: &InferenceContext, email_input: &str) -> FormResult {
    if email_input.is_empty() {
        return FormResult {
            label: "Please enter an email body.".to_string(),
            score: None,
            is_phishing: false,
        };
    }

    match context.classify(email_input) {
        Ok(prediction) => FormResult {
            label: prediction.label.to_string(),
            score: Some(format!("{:.2}%", prediction.score * 100.0)),
            is_phishing: prediction.label == Label::Phishing,
        },
        Err(error) => {
            log::error!("prediction failed: {error:#}");
            FormResult {
                label: format!("Error during prediction: {error:#}"),
                score: None,
                is_phishing: false,
            }
        }
    }
}

fn render_page(result: Option<&FormResult>, email_input: &str) -> String {
    let result_block = match result {
        Some(result) => {
            let class = if result.is_phishing { "phishing" } else { "legitimate" };
            let score_line = match &result.score {
                Some(score) => format!("<p>Confidence: {}</p>", escape_html(score)),
                None => String::new(),
            };
            format!(
                r#"<div class="result {class}"><h2>{}</h2>{score_line}</div>"#,
                escape_html(&result.label)
            )
        }
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<title>phishscan</title>
<style>
body {{ font-family: sans-serif; max-width: 40em; margin: 2em auto; }}
textarea {{ width: 100%; height: 12em; }}
.result.phishing {{ color: #a40000; }}
.result.legitimate {{ color: #006400; }}
</style>
</head>
<body>
<h1>Phishing Email Scanner</h1>
<form method="post" action="/">
<textarea name="email_input" placeholder="Paste an email body...">{}</textarea>
<p><button type="submit">Scan</button></p>
</form>
{result_block}
</body>
</html>
"#,
        escape_html(email_input)
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

//! Server-side HTML for the upload form and the ranked result list.

use std::fmt::Write;

use renewa_core::Prediction;

use crate::config::ServeConfig;

/// What the page shows under the form.
pub enum Outcome<'a> {
    Empty,
    Predicted(&'a Prediction),
    Failed(&'a str),
}

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 40rem; margin: 2rem auto; padding: 0 1rem; color: #1f2933; }
h1 { margin-bottom: 0.25rem; }
p.description { color: #52606d; margin-top: 0; }
form { border: 1px dashed #9aa5b1; border-radius: 8px; padding: 1.5rem; margin: 1.5rem 0; }
button { margin-top: 1rem; padding: 0.5rem 1.25rem; }
.best { font-size: 1.5rem; font-weight: 600; }
ol.labels { list-style: none; padding: 0; }
ol.labels li { margin: 0.5rem 0; }
.bar { background: #e4e7eb; border-radius: 4px; height: 0.75rem; }
.bar span { display: block; background: #3e7c17; border-radius: 4px; height: 100%; }
.error { background: #ffe3e3; border: 1px solid #e12d39; border-radius: 6px; padding: 0.75rem 1rem; }
"#;

pub fn page(config: &ServeConfig, outcome: Outcome<'_>) -> String {
    let mut html = String::with_capacity(4096);
    let title = escape(&config.title);

    let _ = write!(
        html,
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <h1>{title}</h1>\n<p class=\"description\">{}</p>\n",
        escape(&config.description)
    );

    html.push_str(
        "<form action=\"/predict\" method=\"post\" enctype=\"multipart/form-data\">\n\
         <label for=\"image\">Upload a photo</label><br>\n\
         <input type=\"file\" id=\"image\" name=\"image\" accept=\"image/*\" required>\n\
         <br><button type=\"submit\">Classify</button>\n</form>\n",
    );

    match outcome {
        Outcome::Empty => {}
        Outcome::Predicted(prediction) => render_prediction(&mut html, prediction, config.top_k),
        Outcome::Failed(message) => {
            let _ = writeln!(html, "<div class=\"error\">{}</div>", escape(message));
        }
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_prediction(html: &mut String, prediction: &Prediction, top_k: usize) {
    html.push_str("<section class=\"result\">\n");
    if let Some((label, p)) = prediction.best() {
        let _ = write!(
            html,
            "<div class=\"best\">{}</div>\n<p>{}</p>\n",
            escape(label),
            percent(p)
        );
    }

    html.push_str("<ol class=\"labels\">\n");
    for (label, p) in prediction.top(top_k) {
        let width = (p.clamp(0.0, 1.0) * 100.0).round();
        let _ = write!(
            html,
            "<li><div>{} <strong>{}</strong></div>\
             <div class=\"bar\"><span style=\"width: {width}%\"></span></div></li>\n",
            escape(label),
            percent(p)
        );
    }
    html.push_str("</ol>\n</section>\n");
}

fn percent(p: f32) -> String {
    format!("{:.1}%", p * 100.0)
}

/// Minimal HTML text escaping.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

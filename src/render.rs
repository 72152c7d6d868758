//! Server-rendered HTML for the churn form.

use std::collections::HashMap;
use std::fmt::Write;

use crate::inference::PredictionOutcome;
use crate::schema::{FieldKind, FieldSpec, SchemaVariant, Section};

/// Escapes text for use in HTML content and attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Current text of every control, as it should be redisplayed.
#[derive(Debug, Clone, Default)]
pub struct FormValues {
    values: HashMap<&'static str, String>,
}

impl FormValues {
    /// Every control at its default.
    pub fn defaults(schema: SchemaVariant) -> Self {
        let values = schema
            .fields()
            .iter()
            .map(|f| (f.name, f.default_text()))
            .collect();
        Self { values }
    }

    /// Submitted values, falling back to defaults for absent controls.
    pub fn from_submission(schema: SchemaVariant, raw: &HashMap<String, String>) -> Self {
        let values = schema
            .fields()
            .iter()
            .map(|f| {
                let text = raw.get(f.name).cloned().unwrap_or_else(|| f.default_text());
                (f.name, text)
            })
            .collect();
        Self { values }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }
}

/// Everything the form page shows.
#[derive(Debug)]
pub struct FormPage<'a> {
    pub title: &'a str,
    pub schema: SchemaVariant,
    pub values: &'a FormValues,
    pub outcome: Option<&'a PredictionOutcome>,
    pub error: Option<&'a str>,
    pub model_name: Option<&'a str>,
}

const STYLE: &str = r#"
    body { font-family: system-ui, sans-serif; margin: 0; display: flex; color: #262730; }
    aside { width: 16rem; background: #f0f2f6; padding: 1.5rem; min-height: 100vh; box-sizing: border-box; }
    main { flex: 1; padding: 2rem 3rem; max-width: 70rem; }
    .grid { display: grid; grid-template-columns: repeat(3, 1fr); gap: 1rem 2rem; }
    label { display: block; font-size: 0.9rem; margin-bottom: 0.25rem; }
    input, select { width: 100%; padding: 0.4rem; box-sizing: border-box; }
    button { margin-top: 1.5rem; padding: 0.6rem 1.4rem; font-size: 1rem; cursor: pointer; }
    .result { margin-top: 2rem; }
    .churn { background: #ffe4e4; color: #7d0000; padding: 1rem; border-radius: 0.4rem; }
    .stay { background: #dff5e3; color: #0b5d1e; padding: 1rem; border-radius: 0.4rem; }
    .error { background: #fff4d6; color: #6b4b00; padding: 1rem; border-radius: 0.4rem; margin-bottom: 1rem; }
    progress { width: 100%; height: 1.2rem; margin-top: 1rem; }
"#;

fn page_shell(title: &str, sidebar: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{style}</style>
</head>
<body>
<aside>{sidebar}</aside>
<main>
<h1>{title}</h1>
{body}
</main>
</body>
</html>
"#,
        title = escape_html(title),
        style = STYLE,
        sidebar = sidebar,
        body = body,
    )
}

fn about_sidebar(schema: SchemaVariant, model_name: Option<&str>) -> String {
    let mut html = String::from("<h2>About</h2><ul>");
    html.push_str("<li><strong>Dataset</strong>: Telco Customer Churn</li>");
    match model_name {
        Some(name) => {
            let _ = write!(html, "<li><strong>Model</strong>: {}</li>", escape_html(name));
        }
        None => html.push_str("<li><strong>Model</strong>: not loaded</li>"),
    }
    let _ = write!(
        html,
        "<li><strong>Schema</strong>: {} ({} fields)</li>",
        schema,
        schema.fields().len()
    );
    html.push_str("<li><strong>Target</strong>: predict whether a customer will churn</li></ul>");
    html
}

fn render_control(html: &mut String, field: &FieldSpec, current: &str) {
    let _ = write!(
        html,
        r#"<div><label for="{name}">{label}</label>"#,
        name = field.name,
        label = escape_html(field.label)
    );

    match field.kind {
        FieldKind::Integer { min, max, .. } => {
            let _ = write!(
                html,
                r#"<input type="number" id="{name}" name="{name}" min="{min}" max="{max}" step="1" value="{value}" required>"#,
                name = field.name,
                min = min,
                max = max,
                value = escape_html(current)
            );
        }
        FieldKind::Float { min, max, .. } => {
            let _ = write!(
                html,
                r#"<input type="number" id="{name}" name="{name}" min="{min}" max="{max}" step="0.01" value="{value}" required>"#,
                name = field.name,
                min = min,
                max = max,
                value = escape_html(current)
            );
        }
        FieldKind::Choice { .. } | FieldKind::Flag => {
            let _ = write!(html, r#"<select id="{name}" name="{name}">"#, name = field.name);
            for choice in field.choices() {
                let selected = if *choice == current { " selected" } else { "" };
                let _ = write!(
                    html,
                    r#"<option value="{value}"{selected}>{value}</option>"#,
                    value = escape_html(choice),
                    selected = selected
                );
            }
            html.push_str("</select>");
        }
    }

    html.push_str("</div>");
}

fn render_result(html: &mut String, outcome: &PredictionOutcome) {
    let (class, icon) = if outcome.class.is_churn() {
        ("churn", "&#10060;")
    } else {
        ("stay", "&#9989;")
    };

    let _ = write!(
        html,
        r#"<section class="result"><h3>Prediction Result</h3>
<div class="{class}">{icon} The customer is <strong>{verdict}</strong></div>
<progress value="{percent}" max="100">{percent}%</progress>
<p><strong>Churn Probability:</strong> <span id="churn-probability">{probability}</span></p>
</section>"#,
        class = class,
        icon = icon,
        verdict = outcome.class.verdict(),
        percent = outcome.probability_percent(),
        probability = outcome.probability_text()
    );
}

/// Renders the form, with an optional result panel or error banner.
pub fn form_page(page: &FormPage<'_>) -> String {
    let mut body = String::new();
    body.push_str(
        "<p>Provide customer details in the form below and check the probability of churn.</p>",
    );

    if let Some(error) = page.error {
        let _ = write!(body, r#"<div class="error" role="alert">{}</div>"#, escape_html(error));
    }

    body.push_str(r#"<form method="post" action="/predict">"#);
    for section in Section::ALL {
        let fields: Vec<&FieldSpec> = page
            .schema
            .fields()
            .iter()
            .filter(|f| f.section == section)
            .collect();
        if fields.is_empty() {
            continue;
        }

        let _ = write!(body, "<h2>{}</h2><div class=\"grid\">", escape_html(section.title()));
        for field in fields {
            let current = page.values.get(field.name).unwrap_or_default();
            render_control(&mut body, field, current);
        }
        body.push_str("</div>");
    }
    body.push_str(r#"<button type="submit">Predict Churn</button></form>"#);

    if let Some(outcome) = page.outcome {
        render_result(&mut body, outcome);
    }

    page_shell(page.title, &about_sidebar(page.schema, page.model_name), &body)
}

/// Shown instead of the form when the model failed to load.
pub fn unavailable_page(title: &str, schema: SchemaVariant, reason: &str) -> String {
    let body = format!(
        r#"<div class="error" role="alert"><strong>The prediction model could not be loaded.</strong>
<p>{}</p>
<p>Predictions are disabled until the service is restarted with a valid model artifact.</p></div>"#,
        escape_html(reason)
    );
    page_shell(title, &about_sidebar(schema, None), &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::ChurnClass;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_default_form_has_every_control() {
        let values = FormValues::defaults(SchemaVariant::Full);
        let html = form_page(&FormPage {
            title: "Churn",
            schema: SchemaVariant::Full,
            values: &values,
            outcome: None,
            error: None,
            model_name: Some("m"),
        });

        for field in SchemaVariant::Full.fields() {
            assert!(html.contains(&format!(r#"name="{}""#, field.name)), "{}", field.name);
        }
        assert!(html.contains(r#"min="0" max="100" step="1" value="12""#));
        assert!(html.contains(r#"<option value="Month-to-month" selected>"#));
        assert!(html.contains("Predict Churn"));
        assert!(!html.contains("Churn Probability"));
    }

    #[test]
    fn test_result_panel() {
        let values = FormValues::defaults(SchemaVariant::Reduced);
        let outcome = PredictionOutcome {
            class: ChurnClass::Churn,
            churn_probability: 0.8312,
        };
        let html = form_page(&FormPage {
            title: "Churn",
            schema: SchemaVariant::Reduced,
            values: &values,
            outcome: Some(&outcome),
            error: None,
            model_name: None,
        });

        assert!(html.contains("likely to churn"));
        assert!(html.contains(r#"<span id="churn-probability">0.83</span>"#));
        assert!(html.contains(r#"<progress value="83" max="100">"#));
        assert!(html.contains(r#"class="churn""#));
    }

    #[test]
    fn test_submitted_values_are_escaped() {
        let mut raw = HashMap::new();
        raw.insert("tenure".to_string(), "<script>".to_string());
        let values = FormValues::from_submission(SchemaVariant::Reduced, &raw);
        let html = form_page(&FormPage {
            title: "Churn",
            schema: SchemaVariant::Reduced,
            values: &values,
            outcome: None,
            error: Some("tenure must be a number, got '<script>'"),
            model_name: None,
        });

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_unavailable_page() {
        let html = unavailable_page("Churn", SchemaVariant::Full, "cannot read model file model.json");
        assert!(html.contains("cannot read model file model.json"));
        assert!(!html.contains("<form"));
    }
}

//! HTML page for the browser form

use classifier_lib::models::{
    CategoricalField, NumericField, NumericKind, PredictionResult, RawInputRecord,
    CATEGORICAL_FIELDS, NUMERIC_FIELDS,
};

const STYLE: &str = "body{font-family:sans-serif;max-width:40rem;margin:2rem auto}\
label{display:block;margin-top:.6rem}input{width:100%}\
table{margin-top:1.5rem;border-collapse:collapse}\
td,th{border:1px solid #ccc;padding:.3rem .8rem;text-align:left}";

/// Escape text for an HTML body or attribute value
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Render the form, refilled from `previous` and followed by `prediction` when given
pub fn render(previous: Option<&RawInputRecord>, prediction: Option<&PredictionResult>) -> String {
    let mut html = String::new();
    html.push_str(&format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Network Connection Classifier</title>\n<style>{}</style>\n</head>\n<body>\n\
         <h1>Network Connection Classifier</h1>\n\
         <form action=\"/predict\" method=\"post\">\n",
        STYLE
    ));

    for field in NUMERIC_FIELDS {
        numeric_input(&mut html, field, previous);
    }
    for field in CATEGORICAL_FIELDS {
        text_input(&mut html, field, previous);
    }

    html.push_str("<button type=\"submit\">Predict</button>\n</form>\n");

    if let Some(result) = prediction {
        prediction_table(&mut html, result);
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn value_of<'a>(previous: Option<&'a RawInputRecord>, name: &str) -> &'a str {
    previous.and_then(|raw| raw.get(name)).unwrap_or_default()
}

fn numeric_input(html: &mut String, field: NumericField, previous: Option<&RawInputRecord>) {
    let step = match field.kind() {
        NumericKind::Float => "any",
        NumericKind::Integer => "1",
    };
    let name = field.name();
    html.push_str(&format!(
        "<label for=\"{name}\">{name}</label>\
         <input type=\"number\" step=\"{step}\" id=\"{name}\" name=\"{name}\" value=\"{}\" required>\n",
        escape(value_of(previous, name))
    ));
}

fn text_input(html: &mut String, field: CategoricalField, previous: Option<&RawInputRecord>) {
    let name = field.name();
    html.push_str(&format!(
        "<label for=\"{name}\">{name}</label>\
         <input type=\"text\" id=\"{name}\" name=\"{name}\" value=\"{}\" required>\n",
        escape(value_of(previous, name))
    ));
}

fn prediction_table(html: &mut String, result: &PredictionResult) {
    html.push_str("<h2>Predictions</h2>\n<table>\n<tr><th>Model</th><th>Prediction</th></tr>\n");
    for (model, label) in result.iter() {
        html.push_str(&format!(
            "<tr><td>{}</td><td class=\"{}\">{}</td></tr>\n",
            escape(model.display_name()),
            model.as_str(),
            escape(label)
        ));
    }
    html.push_str("</table>\n");
    if let Some(majority) = result.majority() {
        html.push_str(&format!("<p>Majority: <strong>{}</strong></p>\n", escape(majority)));
    }
}

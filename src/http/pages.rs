//! Server-rendered HTML for the web form.

use std::fmt::Write;

use base64::{engine::general_purpose::STANDARD, Engine};

use super::forms::{ACTION_INGEST, METADATA_FIELD_PREFIX};
use super::{PATH_INGEST, PATH_SPLIT};
use crate::bigquery::WriteMode;
use crate::commands::{IngestOutcome, Preview, SplitOutcome};
use crate::config::{Destination, IngestConfig, MetadataKind, SplitterConfig};
use crate::dataset::Column;
use crate::error::ErrorPresentation;
use crate::split::Artifact;

const STYLE: &str = "body{font-family:sans-serif;margin:0;display:flex}\
nav{width:14rem;min-height:100vh;background:#f0f2f6;padding:1rem}\
main{padding:1rem 2rem;flex:1}\
table{border-collapse:collapse}td,th{border:1px solid #ccc;padding:.25rem .5rem}\
.error{background:#fdecea;padding:.75rem}.success{background:#e6f4ea;padding:.75rem}\
label{display:block;margin-top:.75rem}";

/// Escapes text for HTML element content and attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
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

/// `data:` URI carrying the artifact bytes.
pub fn data_uri(artifact: &Artifact) -> String {
    format!(
        "data:{};base64,{}",
        artifact.mime_type,
        STANDARD.encode(&artifact.bytes)
    )
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title>\
         <style>{STYLE}</style></head><body>\
         <nav><h3>Navigation</h3><ul>\
         <li><a href=\"{PATH_INGEST}\">Upload CSV to BigQuery</a></li>\
         <li><a href=\"{PATH_SPLIT}\">CSV Splitter</a></li></ul></nav>\
         <main>{body}</main></body></html>",
        title = escape_html(title),
    )
}

fn error_box(error: &ErrorPresentation) -> String {
    let action = error
        .action
        .as_deref()
        .map(|a| format!("<p><em>{}</em></p>", escape_html(a)))
        .unwrap_or_default();
    format!(
        "<div class=\"error\"><strong>{}</strong><p>{}</p>{}</div>",
        escape_html(&error.title),
        escape_html(&error.message),
        action
    )
}

fn preview_table(preview: &Preview) -> String {
    let mut html = String::from("<table><thead><tr>");
    for column in &preview.columns {
        let _ = write!(
            html,
            "<th>{}<br><small>{}</small></th>",
            escape_html(&column.name),
            column.column_type
        );
    }
    html.push_str("</tr></thead><tbody>");
    for row in &preview.rows {
        html.push_str("<tr>");
        for value in row {
            let _ = write!(html, "<td>{}</td>", escape_html(&value.render()));
        }
        html.push_str("</tr>");
    }
    let _ = write!(
        html,
        "</tbody></table><p>Showing {} of {} rows.</p>",
        preview.rows.len(),
        preview.total_rows
    );
    html
}

pub fn index_page() -> String {
    layout(
        "gbq-toolkit",
        "<h1>gbq-toolkit</h1><p>Pick a tool from the navigation.</p>",
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Ingest
// ─────────────────────────────────────────────────────────────────────────────

pub fn ingest_page(
    config: &IngestConfig,
    outcome: Option<&IngestOutcome>,
    error: Option<&ErrorPresentation>,
) -> String {
    let mut body = String::from(
        "<h1>Upload CSV into GBQ WebApp</h1>\
         <h2>Caution!</h2>\
         <p>Number of columns and sequences in CSV file need to match with the table in GBQ.</p>\
         <h3>Instructions</h3><ul>\
         <li>Upload JSON credential file.</li>\
         <li>Upload CSV file you want to ingest.</li>",
    );
    match &config.destination {
        Destination::FromUserInput => body.push_str("<li>Provide the BigQuery table ID.</li>"),
        Destination::Fixed { table_id } => {
            let _ = write!(
                body,
                "<li>Rows are appended to <code>{}</code>.</li>",
                escape_html(table_id)
            );
        }
    }
    body.push_str("</ul>");

    if let Some(error) = error {
        body.push_str(&error_box(error));
    }

    let _ = write!(
        body,
        "<form method=\"post\" action=\"{PATH_INGEST}\" enctype=\"multipart/form-data\">\
         <label>Upload JSON Credential <input type=\"file\" name=\"credential\" accept=\".json\"></label>\
         <label>Upload CSV File <input type=\"file\" name=\"csv\" accept=\".csv\"></label>"
    );

    if config.destination == Destination::FromUserInput {
        body.push_str(
            "<label>Enter BigQuery Table ID <input type=\"text\" name=\"table_id\" \
             placeholder=\"dataset.table\"></label>",
        );
    }

    for field in config.form_fields() {
        let input_type = if field.kind == MetadataKind::Date {
            "date"
        } else {
            "text"
        };
        let _ = write!(
            body,
            "<label>{label} <input type=\"{input_type}\" name=\"{prefix}{column}\"{required}></label>",
            label = escape_html(field.display_label()),
            prefix = METADATA_FIELD_PREFIX,
            column = escape_html(&field.column),
            required = if field.required { " required" } else { "" },
        );
    }

    body.push_str("<label>Select Function <select name=\"write_mode\">");
    for mode in WriteMode::ALL {
        let _ = write!(body, "<option value=\"{0}\">{0}</option>", mode.as_str());
    }
    let _ = write!(
        body,
        "</select></label><p>\
         <button type=\"submit\" name=\"action\" value=\"preview\">Preview</button> \
         <button type=\"submit\" name=\"action\" value=\"{ACTION_INGEST}\">Let's Ingest</button>\
         </p></form>"
    );

    if let Some(outcome) = outcome {
        body.push_str("<h3>Data Sample</h3>");
        body.push_str(&preview_table(&outcome.preview));
        match &outcome.receipt {
            Some(receipt) => {
                let _ = write!(
                    body,
                    "<div class=\"success\">Data uploaded successfully to BigQuery: \
                     {} rows appended to <code>{}</code> (job <code>{}</code>).</div>",
                    receipt.rows_loaded,
                    escape_html(&receipt.destination),
                    escape_html(&receipt.job_id)
                );
            }
            None => {
                let _ = write!(
                    body,
                    "<p>Preview only. Press \"Let's Ingest\" to {} these rows to <code>{}</code>.</p>",
                    outcome.write_mode.as_str(),
                    escape_html(&outcome.destination)
                );
            }
        }
    }

    layout("Upload CSV to BigQuery", &body)
}

// ─────────────────────────────────────────────────────────────────────────────
// Splitter
// ─────────────────────────────────────────────────────────────────────────────

pub fn split_page(
    config: &SplitterConfig,
    outcome: Option<&SplitOutcome>,
    error: Option<&ErrorPresentation>,
) -> String {
    let mut body = String::from("<h1>CSV Splitter</h1>");

    if let Some(error) = error {
        body.push_str(&error_box(error));
    }

    let columns: &[Column] = outcome.map(|o| o.columns.as_slice()).unwrap_or(&[]);

    let _ = write!(
        body,
        "<form method=\"post\" action=\"{PATH_SPLIT}\" enctype=\"multipart/form-data\">\
         <label>Upload your CSV file <input type=\"file\" name=\"csv\" accept=\".csv\"></label>\
         <p><button type=\"submit\" name=\"mode\" value=\"\">Preview</button></p>\
         <h3>1. Split by Number of Rows</h3>\
         <label>Enter number of rows per file: \
         <input type=\"number\" name=\"rows_per_chunk\" min=\"1\" step=\"100\" value=\"{rows}\"></label>\
         <label>Enter file prefix: <input type=\"text\" name=\"prefix\" value=\"{prefix}\"></label>\
         <p><button type=\"submit\" name=\"mode\" value=\"by_row_count\">Split by Rows</button></p>\
         <h3>2. Split by Group Name</h3>",
        rows = config.default_rows_per_chunk,
        prefix = escape_html(&config.default_prefix),
    );

    if columns.is_empty() {
        body.push_str(
            "<label>Column to split by group name: <input type=\"text\" name=\"column\"></label>",
        );
    } else {
        body.push_str("<label>Select column to split by group name: <select name=\"column\">");
        for column in columns {
            let _ = write!(
                body,
                "<option value=\"{0}\">{0}</option>",
                escape_html(&column.name)
            );
        }
        body.push_str("</select></label>");
    }
    body.push_str(
        "<p><button type=\"submit\" name=\"mode\" value=\"by_column_value\">Split by Group Name</button></p></form>",
    );

    if let Some(outcome) = outcome {
        body.push_str("<h3>Preview of the uploaded file</h3>");
        body.push_str(&preview_table(&outcome.preview));

        if outcome.spec.is_some() {
            let _ = write!(body, "<h3>{} files</h3><ul>", outcome.artifacts.len());
            for artifact in &outcome.artifacts {
                let name = escape_html(&artifact.file_name);
                let _ = write!(
                    body,
                    "<li><a href=\"{}\" download=\"{}\">Download {}</a> ({} rows)</li>",
                    data_uri(artifact),
                    name,
                    name,
                    artifact.row_count
                );
            }
            body.push_str("</ul>");
        }
    }

    layout("CSV Splitter", &body)
}

use crate::document::{render, to_markdown, DocumentInput, SectionInput};
use crate::export;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

/// Accepts `{title, subtitle?, sections}`; a bare `text` becomes one
/// untitled section.
fn parse_input(
    req: &Request,
    value: &serde_json::Value,
) -> Result<DocumentInput, serde_json::Value> {
    let mut input: DocumentInput = serde_json::from_value(value.clone())
        .map_err(|e| err(&req.id, "bad_params", format!("invalid document: {}", e), None))?;
    if input.title.trim().is_empty() {
        return Err(err(&req.id, "bad_params", "title must not be empty", None));
    }
    if input.sections.is_empty() {
        if let Some(text) = value.get("text").and_then(|v| v.as_str()) {
            input.sections.push(SectionInput {
                heading: String::new(),
                body: text.to_string(),
            });
        }
    }
    Ok(input)
}

fn handle_render(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let input = match parse_input(req, &req.params) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let doc = render(&input);
    ok(
        &req.id,
        json!({
            "mathCount": doc.math_count(),
            "markdown": to_markdown(&doc),
            "document": doc,
        }),
    )
}

fn handle_export(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_path = match required_str(req, "outPath") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };
    let Some(raw) = req.params.get("document") else {
        return err(&req.id, "bad_params", "missing document", None);
    };
    let input = match parse_input(req, raw) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let doc = render(&input);
    let markdown = to_markdown(&doc);
    let doc_value = match serde_json::to_value(&doc) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "export_failed", e.to_string(), None),
    };
    match export::export_document_bundle(&doc.title, &markdown, &doc_value, &out_path) {
        Ok(summary) => {
            info!(
                path = %out_path.to_string_lossy(),
                entries = summary.entry_count,
                "document exported"
            );
            let checksums = summary
                .checksums
                .iter()
                .map(|(name, sha)| json!({ "name": name, "sha256": sha }))
                .collect::<Vec<_>>();
            ok(
                &req.id,
                json!({
                    "path": out_path.to_string_lossy(),
                    "documentId": doc.id,
                    "bundleFormat": summary.bundle_format,
                    "entryCount": summary.entry_count,
                    "checksums": checksums,
                }),
            )
        }
        Err(e) => err(&req.id, "export_failed", format!("{:#}", e), None),
    }
}

fn handle_verify_bundle(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match required_str(req, "path") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };
    match export::verify_document_bundle(&path) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "bundleFormat": summary.bundle_format,
                "title": summary.title,
                "verifiedEntries": summary.verified_entries,
            }),
        ),
        Err(e) => err(&req.id, "bundle_invalid", format!("{:#}", e), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "document.render" => Some(handle_render(state, req)),
        "document.export" => Some(handle_export(state, req)),
        "document.verifyBundle" => Some(handle_verify_bundle(state, req)),
        _ => None,
    }
}

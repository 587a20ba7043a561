use anyhow::{anyhow, Context};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const MARKDOWN_ENTRY: &str = "document.md";
const JSON_ENTRY: &str = "document.json";
pub const BUNDLE_FORMAT_V1: &str = "eeebee-document-v1";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
    pub checksums: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct VerifySummary {
    pub bundle_format: String,
    pub title: String,
    pub verified_entries: usize,
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Write `document.md`, `document.json` and a manifest carrying the sha256 of
/// both into a zip at `out_path`.
pub fn export_document_bundle(
    title: &str,
    markdown: &str,
    document: &serde_json::Value,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let document_text =
        serde_json::to_string_pretty(document).context("failed to serialize document")?;
    let checksums = vec![
        (MARKDOWN_ENTRY.to_string(), sha256_hex(markdown.as_bytes())),
        (JSON_ENTRY.to_string(), sha256_hex(document_text.as_bytes())),
    ];

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let entries = checksums
        .iter()
        .map(|(name, sum)| json!({ "name": name, "sha256": sum }))
        .collect::<Vec<_>>();
    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": chrono::Utc::now().to_rfc3339(),
        "title": title,
        "entries": entries,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    zip.start_file(MARKDOWN_ENTRY, opts)
        .context("failed to start markdown entry")?;
    zip.write_all(markdown.as_bytes())
        .context("failed to write markdown entry")?;

    zip.start_file(JSON_ENTRY, opts)
        .context("failed to start document entry")?;
    zip.write_all(document_text.as_bytes())
        .context("failed to write document entry")?;

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count: 3,
        checksums,
    })
}

/// Reopen a bundle and check every manifest checksum against its entry.
pub fn verify_document_bundle(in_path: &Path) -> anyhow::Result<VerifySummary> {
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }

    let entries = manifest
        .get("entries")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    let mut verified = Vec::with_capacity(entries.len());
    for entry in entries {
        let name = entry.get("name").and_then(|v| v.as_str()).unwrap_or("");
        let expected = entry.get("sha256").and_then(|v| v.as_str()).unwrap_or("");
        let mut bytes = Vec::new();
        archive
            .by_name(name)
            .with_context(|| format!("bundle missing {}", name))?
            .read_to_end(&mut bytes)
            .with_context(|| format!("failed to read {}", name))?;
        let actual = sha256_hex(&bytes);
        if actual != expected {
            return Err(anyhow!("checksum mismatch for {}", name));
        }
        verified.push(name.to_string());
    }
    for required in [MARKDOWN_ENTRY, JSON_ENTRY] {
        if !verified.iter().any(|n| n == required) {
            return Err(anyhow!("manifest does not cover {}", required));
        }
    }

    Ok(VerifySummary {
        bundle_format: format.to_string(),
        title: manifest
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string(),
        verified_entries: verified.len(),
    })
}

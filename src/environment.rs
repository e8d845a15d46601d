// src/environment.rs
//! The immutable asset snapshot consumed by helpers and the PDF assembler.
//!
//! Everything here is loaded once at startup (or wholesale on a dev-mode
//! reload): images become base64 data URIs, SVGs stay raw bytes, fonts are
//! read next to their `config.json` descriptor list, and the ICC profile is
//! a single byte buffer. A load failure is fatal; the service never starts
//! with a partially loaded environment.

use crate::config::Config;
use crate::error::PipelineError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::info;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum FontStyle {
    #[serde(rename = "NORMAL", alias = "normal")]
    Normal,
    #[serde(rename = "ITALIC", alias = "italic")]
    Italic,
}

/// One configured font: identity plus raw bytes, loaded once.
#[derive(Debug, Clone)]
pub struct FontDescriptor {
    pub family: String,
    pub weight: u16,
    pub style: FontStyle,
    pub subset: bool,
    pub data: Arc<Vec<u8>>,
}

#[derive(Debug, Deserialize)]
struct FontConfigEntry {
    family: String,
    path: String,
    weight: u16,
    style: FontStyle,
    subset: bool,
}

/// Immutable snapshot of every asset the pipeline needs.
#[derive(Debug, Default)]
pub struct Environment {
    /// Image name (file stem) to `data:` URI.
    pub images: HashMap<String, String>,
    /// Raw resource name (file stem) to bytes. Currently SVGs.
    pub resources: HashMap<String, Vec<u8>>,
    /// ICC profile embedded as the output intent of every document.
    pub color_profile: Vec<u8>,
    pub fonts: Vec<FontDescriptor>,
    pub disable_pdf_get: bool,
    pub enable_html_endpoint: bool,
}

impl Environment {
    pub fn load(config: &Config) -> Result<Self, PipelineError> {
        let (images, resources) = load_resources(&config.resources_path)?;
        let color_profile = fs::read(&config.icc_profile_path).map_err(|e| {
            PipelineError::Config(format!(
                "could not read ICC profile {}: {}",
                config.icc_profile_path.display(),
                e
            ))
        })?;
        let fonts = load_fonts(&config.fonts_path)?;

        info!(
            "Loaded environment: {} image(s), {} resource(s), {} font(s)",
            images.len(),
            resources.len(),
            fonts.len()
        );

        Ok(Environment {
            images,
            resources,
            color_profile,
            fonts,
            disable_pdf_get: config.disable_pdf_get,
            enable_html_endpoint: config.enable_html_endpoint,
        })
    }
}

fn load_resources(
    dir: &Path,
) -> Result<(HashMap<String, String>, HashMap<String, Vec<u8>>), PipelineError> {
    let mut images = HashMap::new();
    let mut resources = HashMap::new();

    let entries = fs::read_dir(dir).map_err(|e| {
        PipelineError::Config(format!("could not read resource directory {}: {}", dir.display(), e))
    })?;

    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let stem = match path.file_stem().and_then(|s| s.to_str()) {
            Some(s) => s.to_string(),
            None => continue,
        };
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("png") | Some("jpg") | Some("jpeg") => {
                let mime = if ext.as_deref() == Some("png") { "image/png" } else { "image/jpeg" };
                let data = fs::read(&path)?;
                images.insert(stem, format!("data:{};base64,{}", mime, BASE64.encode(&data)));
            }
            Some("svg") => {
                resources.insert(stem, fs::read(&path)?);
            }
            _ => {}
        }
    }

    Ok((images, resources))
}

fn load_fonts(dir: &Path) -> Result<Vec<FontDescriptor>, PipelineError> {
    let config_path = dir.join("config.json");
    let raw = fs::read_to_string(&config_path).map_err(|e| {
        PipelineError::Config(format!("could not read font config {}: {}", config_path.display(), e))
    })?;
    let entries: Vec<FontConfigEntry> = serde_json::from_str(&raw)
        .map_err(|e| PipelineError::Config(format!("invalid font config {}: {}", config_path.display(), e)))?;

    let mut fonts = Vec::with_capacity(entries.len());
    for entry in entries {
        let font_path = dir.join(&entry.path);
        let data = fs::read(&font_path).map_err(|e| {
            PipelineError::Config(format!("could not read font {}: {}", font_path.display(), e))
        })?;
        fonts.push(FontDescriptor {
            family: entry.family,
            weight: entry.weight,
            style: entry.style,
            subset: entry.subset,
            data: Arc::new(data),
        });
    }
    Ok(fonts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn load_fails_without_resource_directory() {
        let dir = tempdir().unwrap();
        let config = Config {
            templates_path: dir.path().join("templates"),
            resources_path: dir.path().join("missing"),
            fonts_path: dir.path().join("fonts"),
            icc_profile_path: dir.path().join("missing/profile.icc"),
            disable_pdf_get: false,
            enable_html_endpoint: false,
            dev_mode: false,
            bind_address: String::new(),
        };
        assert!(matches!(Environment::load(&config), Err(PipelineError::Config(_))));
    }

    #[test]
    fn images_become_data_uris() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("logo.png"), [0x89u8, 0x50, 0x4e, 0x47]).unwrap();
        fs::write(dir.path().join("decoration.svg"), b"<svg/>").unwrap();

        let (images, resources) = load_resources(dir.path()).unwrap();
        assert!(images.get("logo").unwrap().starts_with("data:image/png;base64,"));
        assert_eq!(resources.get("decoration").unwrap(), b"<svg/>");
    }

    #[test]
    fn font_config_parses_styles() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("body.ttf"), b"not a real font").unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"[{"family":"Test Sans","path":"body.ttf","weight":400,"style":"NORMAL","subset":false}]"#,
        )
        .unwrap();

        let fonts = load_fonts(dir.path()).unwrap();
        assert_eq!(fonts.len(), 1);
        assert_eq!(fonts[0].family, "Test Sans");
        assert_eq!(fonts[0].style, FontStyle::Normal);
    }
}

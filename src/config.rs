// src/config.rs
//! Process configuration, read once from the environment at startup.

use std::env;
use std::path::PathBuf;

/// Service configuration. Constructed once in `main` and treated as
/// immutable for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory whose immediate subdirectories are application names.
    pub templates_path: PathBuf,
    /// Directory holding images, SVG resources and the ICC profile.
    pub resources_path: PathBuf,
    /// Directory holding font files and their `config.json` descriptor list.
    pub fonts_path: PathBuf,
    /// ICC color profile attached as the PDF/A output intent.
    pub icc_profile_path: PathBuf,
    /// Disables the GET rendering endpoint.
    pub disable_pdf_get: bool,
    /// Enables the raw-HTML rendering endpoint.
    pub enable_html_endpoint: bool,
    /// Rebuilds the environment and template registry on every request.
    pub dev_mode: bool,
    pub bind_address: String,
}

impl Config {
    pub fn from_env() -> Self {
        let resources_path = path_var("RESOURCES_PATH", "resources");
        let icc_profile_path = env::var("ICC_PROFILE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| resources_path.join("sRGB2014.icc"));

        Config {
            templates_path: path_var("TEMPLATES_PATH", "templates"),
            resources_path,
            fonts_path: path_var("FONTS_PATH", "fonts"),
            icc_profile_path,
            disable_pdf_get: flag_var("DISABLE_PDF_GET"),
            enable_html_endpoint: flag_var("ENABLE_HTML_ENDPOINT"),
            dev_mode: flag_var("DEV_MODE"),
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        }
    }
}

fn path_var(name: &str, default: &str) -> PathBuf {
    env::var(name).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(default))
}

fn flag_var(name: &str) -> bool {
    matches!(
        env::var(name).as_deref(),
        Ok("true") | Ok("TRUE") | Ok("1")
    )
}

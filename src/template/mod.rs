// src/template/mod.rs
//! Template discovery and the compiled registry.
//!
//! Templates live on disk as `<root>/<application>/<template>.hbs`. The
//! whole tree is scanned and compiled up front into a single immutable
//! registry; a compilation failure in any file fails the whole build so the
//! service never serves a partially working template set.

pub mod helpers;
pub mod value;

use crate::environment::Environment;
use crate::error::PipelineError;
use handlebars::Handlebars;
use log::{debug, info};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

const TEMPLATE_EXTENSION: &str = "hbs";

/// Identity of one template: the application directory it belongs to plus
/// its file stem.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TemplateKey {
    pub application: String,
    pub template: String,
}

impl TemplateKey {
    pub fn new(application: impl Into<String>, template: impl Into<String>) -> Self {
        TemplateKey {
            application: application.into(),
            template: template.into(),
        }
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.application, self.template)
    }
}

/// Compiled template set. Built once, shared behind an `Arc`, replaced
/// wholesale on reload.
pub struct TemplateRegistry {
    handlebars: Handlebars<'static>,
    keys: BTreeSet<TemplateKey>,
}

impl TemplateRegistry {
    /// Scans the template root and compiles every `.hbs` file found one
    /// level below it. Directory entries are visited in sorted order; if
    /// two files map to the same key the lexicographically last one wins.
    pub fn load(root: &Path, env: &Arc<Environment>) -> Result<Self, PipelineError> {
        let start = Instant::now();
        let mut handlebars = Handlebars::new();
        helpers::register(&mut handlebars, Arc::clone(env));

        let mut keys = BTreeSet::new();
        for (key, path) in discover(root)? {
            debug!("Compiling template {} from {}", key, path.display());
            handlebars.register_template_file(&key.to_string(), &path)?;
            keys.insert(key);
        }

        info!(
            "Compiled {} template(s) from {} in {:?}",
            keys.len(),
            root.display(),
            start.elapsed()
        );
        Ok(TemplateRegistry { handlebars, keys })
    }

    pub fn contains(&self, key: &TemplateKey) -> bool {
        self.keys.contains(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &TemplateKey> {
        self.keys.iter()
    }

    /// Renders a template against a JSON payload. `Ok(None)` when no such
    /// template exists; helper failures propagate as errors.
    pub fn render(&self, key: &TemplateKey, payload: &Value) -> Result<Option<String>, PipelineError> {
        if !self.contains(key) {
            return Ok(None);
        }
        let html = self.handlebars.render(&key.to_string(), payload)?;
        Ok(Some(html))
    }
}

fn discover(root: &Path) -> Result<Vec<(TemplateKey, std::path::PathBuf)>, PipelineError> {
    let mut apps = Vec::new();
    let entries = fs::read_dir(root).map_err(|e| {
        PipelineError::Config(format!(
            "could not read template directory {}: {}",
            root.display(),
            e
        ))
    })?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            apps.push(path);
        }
    }
    apps.sort();

    let mut found = Vec::new();
    for app_dir in apps {
        let application = match app_dir.file_name().and_then(|n| n.to_str()) {
            Some(n) => n.to_string(),
            None => continue,
        };
        let mut files: Vec<_> = fs::read_dir(&app_dir)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|e| e.path())
            .filter(|p| {
                p.is_file() && p.extension().and_then(|e| e.to_str()) == Some(TEMPLATE_EXTENSION)
            })
            .collect();
        files.sort();
        for path in files {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                found.push((TemplateKey::new(application.clone(), stem), path));
            }
        }
    }
    Ok(found)
}

// src/renderer.rs
//! HTML rendering step: template lookup plus payload application.

use crate::error::PipelineError;
use crate::template::{TemplateKey, TemplateRegistry};
use log::{info, warn};
use serde_json::Value;
use std::time::Instant;

/// Renders the named template against the payload. Returns `Ok(None)` when
/// the (application, template) pair is unknown; payload problems surface as
/// [`PipelineError::Malformed`].
pub fn render_html(
    registry: &TemplateRegistry,
    application: &str,
    template: &str,
    payload: &Value,
) -> Result<Option<String>, PipelineError> {
    let key = TemplateKey::new(application, template);
    let start = Instant::now();
    match registry.render(&key, payload) {
        Ok(Some(html)) => {
            info!("Rendered template {} in {:?}", key, start.elapsed());
            Ok(Some(html))
        }
        Ok(None) => {
            warn!("No template registered for {}", key);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use serde_json::json;
    use std::fs;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn helper_failure_is_malformed_input() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("app")).unwrap();
        fs::write(dir.path().join("app/doc.hbs"), "{{iso_to_date date}}").unwrap();
        let registry =
            TemplateRegistry::load(dir.path(), &Arc::new(Environment::default())).unwrap();

        let err = render_html(&registry, "app", "doc", &json!({"date": "never"})).unwrap_err();
        assert!(matches!(err, PipelineError::Malformed(_)));
    }
}

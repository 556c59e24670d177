//! Aspect output parsing.
//!
//! The build aspect writes one `*.qsync.json` file per target (or per batch of
//! targets). A file holds either a single target object or an array of them:
//!
//! ```json
//! {
//!   "label": "//java/com/app:app",
//!   "java": { "jars": ["..."], "android_resources_package": "com.app" },
//!   "cc": { "include_directories": ["..."] }
//! }
//! ```
//!
//! Unknown fields are ignored and missing list fields default to empty.
//! Each target is decoded on its own, so under [`MalformedPolicy::Skip`] one bad
//! entry does not discard its siblings.

use std::path::Path;

use serde_json::Value;
use tracing::trace;

use crate::deps::{BuildError, MalformedPolicy};

use super::TargetBuildInfo;

/// Parse the contents of one aspect output file.
///
/// `source` is only used to name the file in errors.
pub fn parse_aspect_output(
  content: &str,
  source: &Path,
  policy: MalformedPolicy,
) -> Result<Vec<TargetBuildInfo>, BuildError> {
  let value: Value = match serde_json::from_str(content) {
    Ok(value) => value,
    Err(e) => {
      policy.handle(BuildError::malformed(source.display(), format!("invalid JSON: {}", e)))?;
      return Ok(Vec::new());
    }
  };

  let entries = match value {
    Value::Array(entries) => entries,
    Value::Object(_) => vec![value],
    other => {
      policy.handle(BuildError::malformed(
        source.display(),
        format!("expected a target object or an array of targets, found {}", json_kind(&other)),
      ))?;
      return Ok(Vec::new());
    }
  };

  let mut targets = Vec::with_capacity(entries.len());
  for (index, entry) in entries.into_iter().enumerate() {
    let name = entry
      .get("label")
      .and_then(Value::as_str)
      .map(str::to_string)
      .unwrap_or_else(|| format!("{}#{}", source.display(), index));

    match serde_json::from_value::<TargetBuildInfo>(entry) {
      Ok(target) => {
        trace!(label = %target.label, file = %source.display(), "parsed target");
        targets.push(target);
      }
      Err(e) => policy.handle(BuildError::malformed(name, e.to_string()))?,
    }
  }

  Ok(targets)
}

/// Read and parse one aspect output file.
pub fn read_aspect_file(path: &Path, policy: MalformedPolicy) -> Result<Vec<TargetBuildInfo>, BuildError> {
  let content = std::fs::read_to_string(path).map_err(|e| BuildError::unavailable(path, e))?;
  parse_aspect_output(&content, path, policy)
}

/// Async variant of [`read_aspect_file`] for concurrent loading.
pub async fn read_aspect_file_async(path: &Path, policy: MalformedPolicy) -> Result<Vec<TargetBuildInfo>, BuildError> {
  let content = tokio::fs::read_to_string(path)
    .await
    .map_err(|e| BuildError::unavailable(path, e))?;
  parse_aspect_output(&content, path, policy)
}

fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}

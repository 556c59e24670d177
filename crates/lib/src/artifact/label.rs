//! Target labels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when parsing a label string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
  #[error("label is empty")]
  Empty,

  #[error("label contains whitespace: {0:?}")]
  Whitespace(String),

  #[error("label must start with '//' or '@repo//': {0}")]
  MissingRoot(String),

  #[error("label has an empty target name: {0}")]
  EmptyName(String),

  #[error("label has an invalid package path: {0}")]
  InvalidPackage(String),
}

/// Identifies one target in the build graph.
///
/// Canonical form is `//package/path:name`, or `@repo//package/path:name` for
/// targets in an external repository. `//package/path` is shorthand for
/// `//package/path:path`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Label {
  repo: Option<String>,
  package: String,
  name: String,
}

impl Label {
  pub fn parse(raw: &str) -> Result<Self, LabelError> {
    if raw.is_empty() {
      return Err(LabelError::Empty);
    }
    if raw.chars().any(char::is_whitespace) {
      return Err(LabelError::Whitespace(raw.to_string()));
    }

    let (repo, rest) = match raw.strip_prefix('@') {
      Some(after_at) => {
        let split = after_at
          .find("//")
          .ok_or_else(|| LabelError::MissingRoot(raw.to_string()))?;
        let repo = &after_at[..split];
        // `@//foo` names the main repository.
        let repo = (!repo.is_empty()).then(|| repo.to_string());
        (repo, &after_at[split..])
      }
      None => (None, raw),
    };

    let rest = rest
      .strip_prefix("//")
      .ok_or_else(|| LabelError::MissingRoot(raw.to_string()))?;

    let (package, name) = match rest.rsplit_once(':') {
      Some((package, name)) => (package, name.to_string()),
      None => {
        let name = rest.rsplit('/').next().unwrap_or_default();
        (rest, name.to_string())
      }
    };

    if name.is_empty() {
      return Err(LabelError::EmptyName(raw.to_string()));
    }
    if package.starts_with('/') || package.ends_with('/') || package.contains("//") || package.contains(':') {
      return Err(LabelError::InvalidPackage(raw.to_string()));
    }

    Ok(Self {
      repo,
      package: package.to_string(),
      name,
    })
  }

  /// External repository name, `None` for the main repository.
  pub fn repo(&self) -> Option<&str> {
    self.repo.as_deref()
  }

  pub fn package(&self) -> &str {
    &self.package
  }

  pub fn name(&self) -> &str {
    &self.name
  }
}

impl fmt::Display for Label {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(repo) = &self.repo {
      write!(f, "@{}", repo)?;
    }
    write!(f, "//{}:{}", self.package, self.name)
  }
}

impl FromStr for Label {
  type Err = LabelError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Label::parse(s)
  }
}

impl TryFrom<String> for Label {
  type Error = LabelError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    Label::parse(&value)
  }
}

impl From<Label> for String {
  fn from(label: Label) -> Self {
    label.to_string()
  }
}

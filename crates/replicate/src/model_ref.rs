//! Model reference parsing (`owner/name` or `owner/name:version`).

use std::fmt;
use std::str::FromStr;

use crate::error::ReplicateError;

/// Identifies a hosted model, optionally pinned to a version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelRef {
    pub owner: String,
    pub name: String,
    pub version_id: Option<String>,
}

impl ModelRef {
    /// Cache key for version lookups: `owner/name`.
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    pub fn is_pinned(&self) -> bool {
        self.version_id.is_some()
    }
}

impl FromStr for ModelRef {
    type Err = ReplicateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ReplicateError::InvalidModelRef(s.to_string());

        let (model, version) = match s.split_once(':') {
            Some((model, version)) if !version.is_empty() => (model, Some(version)),
            Some(_) => return Err(invalid()),
            None => (s, None),
        };

        let (owner, name) = model.split_once('/').ok_or_else(invalid)?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
            version_id: version.map(str::to_string),
        })
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version_id {
            Some(v) => write!(f, "{}/{}:{v}", self.owner, self.name),
            None => write!(f, "{}/{}", self.owner, self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parses_unpinned_reference() {
        let r: ModelRef = "prunaai/flux-fast".parse().unwrap();
        assert_eq!(r.owner, "prunaai");
        assert_eq!(r.name, "flux-fast");
        assert!(!r.is_pinned());
        assert_eq!(r.slug(), "prunaai/flux-fast");
    }

    #[test]
    fn parses_pinned_reference() {
        let r: ModelRef = "cjwbw/midas:a6ba5798f04f".parse().unwrap();
        assert_eq!(r.version_id.as_deref(), Some("a6ba5798f04f"));
        assert_eq!(r.to_string(), "cjwbw/midas:a6ba5798f04f");
    }

    #[test]
    fn rejects_malformed_references() {
        for bad in ["flux", "/flux", "owner/", "a/b/c", "owner/name:", ""] {
            assert_matches!(
                bad.parse::<ModelRef>(),
                Err(ReplicateError::InvalidModelRef(_)),
                "{bad}"
            );
        }
    }
}

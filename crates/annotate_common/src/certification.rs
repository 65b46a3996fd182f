use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

pub const CERTIFICATION_VERSION: u32 = 1;
pub const CERTIFICATION_SOURCE: &str = "annotate-kit";

/// Per-layer certification sidecar: who signed a mask off, when, and whether
/// it was flagged as a hard example. Where the record is stored is the
/// persistence collaborator's concern; this type only owns the content and
/// the replacement rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificationRecord {
    pub version: u32,
    pub certified: bool,
    pub username: Option<String>,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub hard_example: bool,
}

impl CertificationRecord {
    pub fn new(certified: bool, hard_example: bool, username: Option<String>) -> Self {
        Self {
            version: CERTIFICATION_VERSION,
            certified,
            username,
            source: CERTIFICATION_SOURCE.to_string(),
            timestamp: Utc::now(),
            hard_example,
        }
    }

    /// A fresh record replaces `prior` only when something observable
    /// changed: the certified flag, the hard-example flag, or the mask
    /// content itself.
    pub fn should_replace(&self, prior: Option<&CertificationRecord>, mask_modified: bool) -> bool {
        match prior {
            None => true,
            Some(prior) => {
                prior.certified != self.certified
                    || prior.hard_example != self.hard_example
                    || mask_modified
            }
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replacement_rule() {
        let prior = CertificationRecord::new(true, false, Some("alice".into()));
        let same = CertificationRecord::new(true, false, Some("bob".into()));
        assert!(!same.should_replace(Some(&prior), false));
        assert!(same.should_replace(Some(&prior), true));

        let flipped = CertificationRecord::new(false, false, None);
        assert!(flipped.should_replace(Some(&prior), false));

        let hard = CertificationRecord::new(true, true, None);
        assert!(hard.should_replace(Some(&prior), false));
        assert!(hard.should_replace(None, false));
    }

    #[test]
    fn json_roundtrip_defaults_hard_example() {
        let record = CertificationRecord::new(true, true, Some("carol".into()));
        let json = record.to_json().unwrap();
        let parsed = CertificationRecord::from_json(&json).unwrap();
        assert_eq!(parsed, record);

        // Records written before the hard-example flag existed still parse.
        let legacy = r#"{
            "version": 1,
            "certified": false,
            "username": null,
            "source": "annotate-kit",
            "timestamp": "2026-01-05T10:00:00Z"
        }"#;
        let parsed = CertificationRecord::from_json(legacy).unwrap();
        assert!(!parsed.hard_example);
    }
}

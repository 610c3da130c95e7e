//! Inline session policy passed to AssumeRole
//!
//! Each identifier contributes raw statement fragments of the form
//! `{"Effect": .., "Action": [..], "Resource": [..]}`. They are parsed and
//! wrapped into a document with a constant Sid and Principal.

use serde::{Deserialize, Serialize};

use crate::constants::{POLICY_VERSION, STATEMENT_PRINCIPAL, STATEMENT_SID};
use crate::error::{Error, Result};

/// A statement as configured, before Sid/Principal are injected
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyFragment {
    pub effect: String,
    pub action: Vec<String>,
    pub resource: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub sid: String,
    pub effect: String,
    pub action: Vec<String>,
    pub principal: String,
    pub resource: Vec<String>,
}

impl From<PolicyFragment> for PolicyStatement {
    fn from(fragment: PolicyFragment) -> Self {
        Self {
            sid: STATEMENT_SID.to_string(),
            effect: fragment.effect,
            action: fragment.action,
            principal: STATEMENT_PRINCIPAL.to_string(),
            resource: fragment.resource,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    #[serde(rename = "Statement")]
    pub statements: Vec<PolicyStatement>,
}

impl PolicyDocument {
    /// Parse every fragment in order; the first malformed one fails the build
    pub fn from_fragments<S: AsRef<str>>(identifier: &str, fragments: &[S]) -> Result<Self> {
        let statements = fragments
            .iter()
            .map(|raw| {
                serde_json::from_str::<PolicyFragment>(raw.as_ref())
                    .map(PolicyStatement::from)
                    .map_err(|source| Error::PolicyBuild {
                        identifier: identifier.to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            version: POLICY_VERSION.to_string(),
            statements,
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

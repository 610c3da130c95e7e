use serde::Serialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    env,
};
use tracing::debug;

use crate::constants::{
    ARN_FIELD, DEFAULT_EXPIRES_IN, ENV_NAMESPACE, EXPIRES_IN_FIELD, POLICY_FIELD, TITLE_FIELD,
};
use crate::error::{Error, Result};

/// Everything configured for one identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentifierMetadata {
    pub title: Option<String>,
    /// Session duration in seconds, as configured (defaults to 900)
    pub expires_in: String,
    /// `None` marks an incomplete identifier that cannot be issued
    pub arn: Option<String>,
    /// Raw policy fragments in scan order
    pub policies: Vec<String>,
}

impl Default for IdentifierMetadata {
    fn default() -> Self {
        Self {
            title: None,
            expires_in: DEFAULT_EXPIRES_IN.to_string(),
            arn: None,
            policies: Vec::new(),
        }
    }
}

/// Identifier -> metadata map built once from a flat key/value snapshot.
///
/// Keys are `<FIELD>_<IDENTIFIER>` with FIELD one of `EXPIRES_IN`, `ARN`,
/// `TITLE` or `POLICY`. The first three match the identifier exactly.
/// `POLICY_<ID>` and `POLICY_<ID>_<suffix>` belong to the longest
/// identifier declared by another field; a policy key with no declared
/// owner is attributed to its first underscore-delimited segment.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    identifiers: BTreeMap<String, IdentifierMetadata>,
}

impl Registry {
    /// Build from un-namespaced entries, keeping their order for policies
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries: Vec<(String, String)> = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v)| !v.is_empty())
            .collect();

        let mut identifiers: BTreeMap<String, IdentifierMetadata> = BTreeMap::new();

        for (key, value) in &entries {
            let Some((field, id)) = split_scalar_field(key) else {
                continue;
            };
            let metadata = identifiers.entry(id.to_string()).or_default();
            match field {
                ScalarField::ExpiresIn => metadata.expires_in = value.clone(),
                ScalarField::Arn => metadata.arn = Some(value.clone()),
                ScalarField::Title => metadata.title = Some(value.clone()),
            }
        }

        let declared: BTreeSet<String> = identifiers.keys().cloned().collect();

        for (key, value) in &entries {
            let Some(suffix) = key.strip_prefix(POLICY_FIELD) else {
                continue;
            };
            let Some(owner) = policy_owner(suffix, &declared) else {
                debug!("Ignoring policy entry without identifier: {}", key);
                continue;
            };
            identifiers
                .entry(owner)
                .or_default()
                .policies
                .push(value.clone());
        }

        Self { identifiers }
    }

    /// Build from `STS_`-namespaced process environment variables.
    ///
    /// Variables are sorted by name before scanning so that policy order
    /// does not depend on the platform's environment ordering. A trailing
    /// numeric segment sorts as a number, so `POLICY_X_2` precedes
    /// `POLICY_X_10`.
    pub fn from_env() -> Self {
        let mut entries: Vec<(String, String)> = env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .filter_map(|(k, v)| Some((k.strip_prefix(ENV_NAMESPACE)?.to_string(), v)))
            .collect();
        entries.sort_by(|a, b| env_sort_key(&a.0).cmp(&env_sort_key(&b.0)));

        let registry = Self::from_entries(entries);
        debug!("Loaded {} identifiers from environment", registry.len());
        registry
    }

    /// Metadata for an identifier, complete or not
    pub fn lookup(&self, identifier: &str) -> Result<&IdentifierMetadata> {
        self.identifiers
            .get(identifier)
            .ok_or_else(|| Error::NotFound(identifier.to_string()))
    }

    /// Metadata for an identifier that has everything needed for issuance
    pub fn resolve_metadata(&self, identifier: &str) -> Result<IdentifierMetadata> {
        let metadata = self.lookup(identifier)?;
        if metadata.arn.is_none() {
            return Err(Error::MissingRequiredField {
                identifier: identifier.to_string(),
                field: "arn",
            });
        }
        Ok(metadata.clone())
    }

    /// Every observed identifier, incomplete ones included
    pub fn list_identifiers(&self) -> BTreeMap<String, IdentifierMetadata> {
        self.identifiers.clone()
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
enum ScalarField {
    ExpiresIn,
    Arn,
    Title,
}

fn split_scalar_field(key: &str) -> Option<(ScalarField, &str)> {
    [
        (ScalarField::ExpiresIn, EXPIRES_IN_FIELD),
        (ScalarField::Arn, ARN_FIELD),
        (ScalarField::Title, TITLE_FIELD),
    ]
    .into_iter()
    .find_map(|(field, prefix)| Some((field, key.strip_prefix(prefix)?)))
    .filter(|(_, id)| !id.is_empty())
}

fn policy_owner(suffix: &str, declared: &BTreeSet<String>) -> Option<String> {
    declared
        .iter()
        .filter(|id| {
            suffix
                .strip_prefix(id.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('_'))
        })
        .max_by_key(|id| id.len())
        .cloned()
        .or_else(|| {
            suffix
                .split('_')
                .next()
                .filter(|segment| !segment.is_empty())
                .map(String::from)
        })
}

fn env_sort_key(key: &str) -> (&str, Option<u64>) {
    match key.rsplit_once('_') {
        Some((stem, index)) => match index.parse() {
            Ok(index) => (stem, Some(index)),
            Err(_) => (key, None),
        },
        None => (key, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const S3_READ: &str = r#"{"Effect":"Allow","Action":["s3:GetObject"],"Resource":["*"]}"#;
    const S3_WRITE: &str =
        r#"{"Effect":"Allow","Action":["s3:PutObject"],"Resource":["arn:aws:s3:::bucket/*"]}"#;

    #[test]
    fn test_resolve_metadata_round_trip() {
        let registry = Registry::from_entries([
            ("ARN_X", "roleX"),
            ("EXPIRES_IN_X", "1800"),
            ("POLICY_X_1", S3_READ),
        ]);

        let metadata = registry.resolve_metadata("X").unwrap();
        assert_eq!(metadata.arn.as_deref(), Some("roleX"));
        assert_eq!(metadata.expires_in, "1800");
        assert_eq!(metadata.policies, vec![S3_READ.to_string()]);
        assert_eq!(metadata.title, None);
    }

    #[test]
    fn test_expires_in_defaults() {
        let registry = Registry::from_entries([("ARN_X", "roleX")]);
        let metadata = registry.resolve_metadata("X").unwrap();
        assert_eq!(metadata.expires_in, DEFAULT_EXPIRES_IN);
    }

    #[test]
    fn test_policies_are_aggregated_in_order() {
        let registry = Registry::from_entries([
            ("POLICY_X_1", S3_WRITE),
            ("ARN_X", "roleX"),
            ("POLICY_X_0", S3_READ),
            ("POLICY_X", r#"{"Effect":"Deny","Action":[],"Resource":[]}"#),
        ]);

        let metadata = registry.resolve_metadata("X").unwrap();
        assert_eq!(metadata.policies.len(), 3);
        assert_eq!(metadata.policies[0], S3_WRITE);
        assert_eq!(metadata.policies[1], S3_READ);
    }

    #[test]
    fn test_identifier_does_not_match_longer_identifier() {
        let registry = Registry::from_entries([
            ("ARN_A", "roleA"),
            ("ARN_AB", "roleAB"),
            ("EXPIRES_IN_AB", "3600"),
            ("POLICY_AB_0", S3_READ),
            ("POLICY_A_0", S3_WRITE),
        ]);

        let a = registry.resolve_metadata("A").unwrap();
        assert_eq!(a.arn.as_deref(), Some("roleA"));
        assert_eq!(a.expires_in, DEFAULT_EXPIRES_IN);
        assert_eq!(a.policies, vec![S3_WRITE.to_string()]);

        let ab = registry.resolve_metadata("AB").unwrap();
        assert_eq!(ab.arn.as_deref(), Some("roleAB"));
        assert_eq!(ab.expires_in, "3600");
        assert_eq!(ab.policies, vec![S3_READ.to_string()]);
    }

    #[test]
    fn test_policy_goes_to_longest_declared_identifier() {
        let registry = Registry::from_entries([
            ("ARN_TEAM", "roleTeam"),
            ("ARN_TEAM_OPS", "roleOps"),
            ("POLICY_TEAM_OPS_0", S3_READ),
            ("POLICY_TEAM_0", S3_WRITE),
        ]);

        assert_eq!(
            registry.lookup("TEAM_OPS").unwrap().policies,
            vec![S3_READ.to_string()]
        );
        assert_eq!(
            registry.lookup("TEAM").unwrap().policies,
            vec![S3_WRITE.to_string()]
        );
    }

    #[test]
    fn test_policy_only_identifier_is_listed_as_incomplete() {
        let registry = Registry::from_entries([("ARN_X", "roleX"), ("POLICY_Y_0", S3_READ)]);

        let listing = registry.list_identifiers();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing["Y"].arn, None);
        assert_eq!(listing["Y"].policies, vec![S3_READ.to_string()]);

        let err = registry.resolve_metadata("Y").unwrap_err();
        assert!(matches!(err, Error::MissingRequiredField { field: "arn", .. }));
    }

    #[test]
    fn test_unknown_identifier_is_not_found() {
        let registry = Registry::from_entries([("ARN_X", "roleX")]);
        assert!(matches!(
            registry.resolve_metadata("Z"),
            Err(Error::NotFound(id)) if id == "Z"
        ));
    }

    #[test]
    fn test_list_identifiers_one_entry_per_identifier() {
        let registry = Registry::from_entries([
            ("ARN_X", "roleX"),
            ("EXPIRES_IN_X", "1200"),
            ("TITLE_X", "Backups"),
            ("POLICY_X_0", S3_READ),
            ("POLICY_X_1", S3_WRITE),
            ("EXPIRES_IN_Y", "60"),
        ]);

        let listing = registry.list_identifiers();
        assert_eq!(listing.keys().collect::<Vec<_>>(), vec!["X", "Y"]);
        assert_eq!(listing["X"].title.as_deref(), Some("Backups"));
        assert_eq!(listing["X"].policies.len(), 2);
        assert_eq!(listing["Y"].expires_in, "60");
        assert_eq!(listing["Y"].arn, None);
    }

    #[test]
    fn test_empty_values_and_bare_prefixes_are_ignored() {
        let registry = Registry::from_entries([
            ("ARN_X", ""),
            ("ARN_", "roleless"),
            ("POLICY_", S3_READ),
            ("PORTS", "3333"),
        ]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_metadata_serialization() {
        let registry = Registry::from_entries([("ARN_X", "roleX"), ("POLICY_X_0", S3_READ)]);
        let json = serde_json::to_value(registry.lookup("X").unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "title": null,
                "expires_in": "900",
                "arn": "roleX",
                "policies": [S3_READ]
            })
        );
    }

    #[test]
    #[serial]
    fn test_from_env_strips_namespace_and_sorts() {
        unsafe {
            env::set_var("STS_ARN_ENVTEST", "roleEnv");
            env::set_var("STS_POLICY_ENVTEST_1", S3_WRITE);
            env::set_var("STS_POLICY_ENVTEST_0", S3_READ);
            env::set_var("ARN_NOTNAMESPACED", "ignored");
        }

        let registry = Registry::from_env();

        unsafe {
            env::remove_var("STS_ARN_ENVTEST");
            env::remove_var("STS_POLICY_ENVTEST_1");
            env::remove_var("STS_POLICY_ENVTEST_0");
            env::remove_var("ARN_NOTNAMESPACED");
        }

        let metadata = registry.resolve_metadata("ENVTEST").unwrap();
        assert_eq!(metadata.arn.as_deref(), Some("roleEnv"));
        assert_eq!(
            metadata.policies,
            vec![S3_READ.to_string(), S3_WRITE.to_string()]
        );
        assert!(registry.lookup("NOTNAMESPACED").is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_orders_policy_indices_numerically() {
        let indices = [10, 2, 0, 1];
        unsafe {
            env::set_var("STS_ARN_NUMSORT", "roleNum");
            for i in indices {
                env::set_var(format!("STS_POLICY_NUMSORT_{i}"), format!("{{\"n\":{i}}}"));
            }
        }

        let registry = Registry::from_env();

        unsafe {
            env::remove_var("STS_ARN_NUMSORT");
            for i in indices {
                env::remove_var(format!("STS_POLICY_NUMSORT_{i}"));
            }
        }

        let metadata = registry.resolve_metadata("NUMSORT").unwrap();
        assert_eq!(
            metadata.policies,
            vec![r#"{"n":0}"#, r#"{"n":1}"#, r#"{"n":2}"#, r#"{"n":10}"#]
        );
    }

    #[test]
    fn test_env_sort_key() {
        assert!(env_sort_key("POLICY_X_2") < env_sort_key("POLICY_X_10"));
        assert_eq!(env_sort_key("ARN_X"), ("ARN_X", None));
        assert_eq!(env_sort_key("TITLE"), ("TITLE", None));
    }
}

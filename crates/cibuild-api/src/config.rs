//! Step configuration
//!
//! Configuration is built once from static pipeline config when the graph
//! is assembled and is read-only afterwards.

use crate::error::ConfigError;
use crate::types::PipelineImageStreamTagReference;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Characters the generated substitution command cannot carry verbatim.
///
/// `?` delimits the `sed` expression, the quotes and backslash would break
/// out of the shell and exec-form quoting.
pub const RESERVED_SUBSTITUTION_CHARS: &[char] = &['?', '\'', '"', '\\', '\n', '\r'];

/// Expands to the matched text in a `sed` replacement
pub const SED_MATCH_REFERENCE: char = '&';

/// Configuration of one step, tagged by step kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum StepConfiguration {
    /// Rewrite operator manifests from the source image into a new image
    BundleSourceStep(BundleSourceStepConfiguration),
}

impl StepConfiguration {
    /// Parse a YAML document
    ///
    /// The step kind is the single key of the top-level map, e.g.
    /// `bundle_source_step: {...}`.
    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let de = serde_yaml::Deserializer::from_str(raw);
        Ok(serde_yaml::with::singleton_map::deserialize(de)?)
    }

    /// Read and parse a YAML file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Validate the variant's configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::BundleSourceStep(config) => config.validate(),
        }
    }
}

/// One planned rewrite of an existing pull spec
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PullSpecSubstitution {
    /// Literal pull spec to search for in the manifests
    pub pull_spec: String,
    /// Symbolic tag on the stable stream to replace it with
    pub with: String,
}

impl PullSpecSubstitution {
    /// Create a substitution
    #[must_use]
    pub fn new(pull_spec: impl Into<String>, with: impl Into<String>) -> Self {
        Self {
            pull_spec: pull_spec.into(),
            with: with.into(),
        }
    }
}

/// Configuration of the bundle source step
///
/// `substitute` is ordered: entries become sequential recipe instructions
/// over the same filesystem, so later entries see the output of earlier
/// ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleSourceStepConfiguration {
    /// Destination pipeline image tag, unique per step in the graph
    pub to: PipelineImageStreamTagReference,
    /// Directory inside the source tree holding the bundle
    #[serde(default)]
    pub context_dir: String,
    /// Manifest directory, relative to `context_dir`
    #[serde(default)]
    pub operator_manifests: String,
    /// Ordered pull spec substitutions
    #[serde(default)]
    pub substitute: Vec<PullSpecSubstitution>,
}

impl BundleSourceStepConfiguration {
    /// Create a configuration with no substitutions
    #[must_use]
    pub fn new(
        to: impl Into<PipelineImageStreamTagReference>,
        context_dir: impl Into<String>,
        operator_manifests: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            context_dir: context_dir.into(),
            operator_manifests: operator_manifests.into(),
            substitute: Vec::new(),
        }
    }

    /// Append a substitution
    #[must_use]
    pub fn with_substitution(mut self, pull_spec: impl Into<String>, with: impl Into<String>) -> Self {
        self.substitute.push(PullSpecSubstitution::new(pull_spec, with));
        self
    }

    /// Manifest directory: `context_dir` joined with `operator_manifests`
    #[must_use]
    pub fn manifest_dir(&self) -> String {
        clean_join(&[&self.context_dir, &self.operator_manifests])
    }

    /// Check required fields and substitution values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.to.is_empty() {
            return Err(ConfigError::MissingField {
                field: "to".to_string(),
            });
        }
        for (i, sub) in self.substitute.iter().enumerate() {
            for (name, value) in [("pull_spec", &sub.pull_spec), ("with", &sub.with)] {
                let field = format!("substitute[{i}].{name}");
                if value.is_empty() {
                    return Err(ConfigError::MissingField { field });
                }
                let found = match name {
                    "with" => reserved_character(value)
                        .or_else(|| value.chars().find(|c| *c == SED_MATCH_REFERENCE)),
                    _ => reserved_character(value),
                };
                if let Some(character) = found {
                    return Err(ConfigError::ReservedCharacter {
                        field,
                        value: value.clone(),
                        character,
                    });
                }
            }
        }
        for (field, value) in [
            ("context_dir", &self.context_dir),
            ("operator_manifests", &self.operator_manifests),
        ] {
            if let Some(character) = unsafe_path_character(value) {
                return Err(ConfigError::ReservedCharacter {
                    field: field.to_string(),
                    value: value.clone(),
                    character,
                });
            }
        }
        Ok(())
    }
}

/// First character of `value` that may not appear in a substitution
#[must_use]
pub fn reserved_character(value: &str) -> Option<char> {
    value.chars().find(|c| RESERVED_SUBSTITUTION_CHARS.contains(c))
}

/// First character of a manifest path that may not appear in the command
///
/// Paths are interpolated unquoted into the `find` argument list, so
/// whitespace is rejected on top of the reserved characters.
#[must_use]
pub fn unsafe_path_character(path: &str) -> Option<char> {
    reserved_character(path).or_else(|| path.chars().find(|c| c.is_whitespace()))
}

/// Join path fragments and clean the result lexically
///
/// Empty fragments are skipped, `.` segments dropped and `..` folded into
/// the preceding segment. Joining nothing yields an empty string.
#[must_use]
pub fn clean_join(parts: &[&str]) -> String {
    let joined = parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        return joined;
    }

    let rooted = joined.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(last) if *last != ".." => {
                    segments.pop();
                }
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let body = segments.join("/");
    if rooted {
        format!("/{body}")
    } else if body.is_empty() {
        ".".to_string()
    } else {
        body
    }
}

/// Identity of the running CI job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Namespace all of the job's objects live in
    pub namespace: String,
    /// Job name
    #[serde(default)]
    pub job: String,
    /// Build identifier of this job run
    #[serde(default)]
    pub build_id: String,
}

impl JobSpec {
    /// Create a job spec for a namespace
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            job: String::new(),
            build_id: String::new(),
        }
    }

    /// With job name and build id
    #[must_use]
    pub fn with_job(mut self, job: impl Into<String>, build_id: impl Into<String>) -> Self {
        self.job = job.into();
        self.build_id = build_id.into();
        self
    }

    /// Job namespace
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

/// Compute resource requests and limits, keyed by resource name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    /// Guaranteed amounts, e.g. `cpu: 100m`
    #[serde(default)]
    pub requests: BTreeMap<String, String>,
    /// Upper bounds, e.g. `memory: 2Gi`
    #[serde(default)]
    pub limits: BTreeMap<String, String>,
}

/// Resource requirements per step name; `*` holds the defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceConfiguration(pub BTreeMap<String, ResourceRequirements>);

impl ResourceConfiguration {
    /// Key holding requirements for steps without their own entry
    pub const DEFAULT_KEY: &'static str = "*";

    /// Set requirements for a step name (or `*`)
    #[must_use]
    pub fn with(mut self, step: impl Into<String>, requirements: ResourceRequirements) -> Self {
        self.0.insert(step.into(), requirements);
        self
    }

    /// Requirements for `step`: its own entry layered over the defaults
    #[must_use]
    pub fn requirements_for_step(&self, step: &str) -> ResourceRequirements {
        let mut merged = self.0.get(Self::DEFAULT_KEY).cloned().unwrap_or_default();
        if let Some(own) = self.0.get(step) {
            merged.requests.extend(own.requests.clone());
            merged.limits.extend(own.limits.clone());
        }
        merged
    }
}

/// Registry pull credentials, passed to builds untouched
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullSecret {
    /// Secret object name
    pub name: String,
    /// Secret payload; never serialised
    #[serde(default, skip_serializing)]
    pub data: BTreeMap<String, String>,
}

impl PullSecret {
    /// Reference a secret by name
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: BTreeMap::new(),
        }
    }
}

impl std::fmt::Debug for PullSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PullSecret")
            .field("name", &self.name)
            .field("data", &format_args!("<{} keys redacted>", self.data.len()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const BUNDLE_YAML: &str = r"
bundle_source_step:
  to: ci-bundle0
  context_dir: bundle
  operator_manifests: manifests
  substitute:
    - pull_spec: quay.io/openshift/origin-operator:latest
      with: operator
    - pull_spec: quay.io/openshift/origin-operand:latest
      with: operand
";

    #[test]
    fn parses_tagged_bundle_source_config() {
        let config = StepConfiguration::from_yaml_str(BUNDLE_YAML).unwrap();
        let StepConfiguration::BundleSourceStep(bundle) = config;

        assert_eq!(bundle.to.as_str(), "ci-bundle0");
        assert_eq!(bundle.manifest_dir(), "bundle/manifests");
        assert_eq!(
            bundle.substitute,
            vec![
                PullSpecSubstitution::new("quay.io/openshift/origin-operator:latest", "operator"),
                PullSpecSubstitution::new("quay.io/openshift/origin-operand:latest", "operand"),
            ]
        );
    }

    #[test]
    fn optional_fields_default_to_empty() {
        let config = StepConfiguration::from_yaml_str("bundle_source_step:\n  to: bundle\n").unwrap();
        let StepConfiguration::BundleSourceStep(bundle) = config;
        assert!(bundle.substitute.is_empty());
        assert_eq!(bundle.manifest_dir(), "");
    }

    #[test]
    fn unknown_step_kind_is_a_parse_error() {
        let err = StepConfiguration::from_yaml_str("lease_step:\n  to: x\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(BUNDLE_YAML.as_bytes()).unwrap();

        let config = StepConfiguration::from_path(file.path()).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = StepConfiguration::from_path("/nonexistent/step.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/step.yaml"));
    }

    #[test]
    fn validate_rejects_empty_destination() {
        let config = BundleSourceStepConfiguration::new("", "bundle", "manifests");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingField { field }) if field == "to"
        ));
    }

    #[test]
    fn validate_rejects_reserved_characters() {
        let config = BundleSourceStepConfiguration::new("bundle", "", "manifests")
            .with_substitution("quay.io/a/b:1", "ok")
            .with_substitution("quay.io/a/b?x", "ok");
        match config.validate() {
            Err(ConfigError::ReservedCharacter { field, character, .. }) => {
                assert_eq!(field, "substitute[1].pull_spec");
                assert_eq!(character, '?');
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let quoted = BundleSourceStepConfiguration::new("bundle", "", "manifests")
            .with_substitution("quay.io/a/b:1", "it's");
        assert!(matches!(
            quoted.validate(),
            Err(ConfigError::ReservedCharacter { character: '\'', .. })
        ));
    }

    #[test]
    fn validate_rejects_match_reference_in_tag() {
        let config = BundleSourceStepConfiguration::new("bundle", "", "manifests")
            .with_substitution("quay.io/a/b:1", "a&b");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ReservedCharacter { field, character: '&', .. }) if field == "substitute[0].with"
        ));
    }

    #[test]
    fn validate_rejects_unsafe_manifest_paths() {
        let spaced = BundleSourceStepConfiguration::new("bundle", "my bundle", "manifests");
        assert!(matches!(
            spaced.validate(),
            Err(ConfigError::ReservedCharacter { field, character: ' ', .. }) if field == "context_dir"
        ));

        let quoted = BundleSourceStepConfiguration::new("bundle", "bun\"dle", "manifests");
        assert!(matches!(
            quoted.validate(),
            Err(ConfigError::ReservedCharacter { field, character: '"', .. }) if field == "context_dir"
        ));

        let tabbed = BundleSourceStepConfiguration::new("bundle", "bundle", "mani\tfests");
        assert!(matches!(
            tabbed.validate(),
            Err(ConfigError::ReservedCharacter { field, .. }) if field == "operator_manifests"
        ));
    }

    #[test]
    fn validate_rejects_empty_substitution_fields() {
        let config = BundleSourceStepConfiguration::new("bundle", "", "manifests")
            .with_substitution("quay.io/a/b:1", "");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingField { field }) if field == "substitute[0].with"
        ));
    }

    #[test]
    fn clean_join_matches_lexical_path_rules() {
        assert_eq!(clean_join(&["", ""]), "");
        assert_eq!(clean_join(&["", "manifests"]), "manifests");
        assert_eq!(clean_join(&["bundle", "manifests"]), "bundle/manifests");
        assert_eq!(clean_join(&["./bundle/", "./manifests/"]), "bundle/manifests");
        assert_eq!(clean_join(&["bundle", "../manifests"]), "manifests");
        assert_eq!(clean_join(&["bundle", ".."]), ".");
        assert_eq!(clean_join(&["..", "manifests"]), "../manifests");
        assert_eq!(clean_join(&["/bundle", "../../manifests"]), "/manifests");
    }

    #[test]
    fn step_resources_override_defaults() {
        let mut defaults = ResourceRequirements::default();
        defaults.requests.insert("cpu".into(), "100m".into());
        defaults.requests.insert("memory".into(), "200Mi".into());
        let mut own = ResourceRequirements::default();
        own.requests.insert("memory".into(), "1Gi".into());
        own.limits.insert("memory".into(), "2Gi".into());

        let resources = ResourceConfiguration::default()
            .with("*", defaults)
            .with("bundle", own);

        let merged = resources.requirements_for_step("bundle");
        assert_eq!(merged.requests["cpu"], "100m");
        assert_eq!(merged.requests["memory"], "1Gi");
        assert_eq!(merged.limits["memory"], "2Gi");

        let other = resources.requirements_for_step("unit");
        assert_eq!(other.requests["memory"], "200Mi");
        assert!(other.limits.is_empty());
    }

    #[test]
    fn pull_secret_data_is_redacted() {
        let mut secret = PullSecret::named("registry-pull-credentials");
        secret.data.insert(".dockerconfigjson".into(), "c2VjcmV0".into());

        let debug = format!("{secret:?}");
        assert!(debug.contains("registry-pull-credentials"));
        assert!(!debug.contains("c2VjcmV0"));

        let yaml = serde_yaml::to_string(&secret).unwrap();
        assert!(!yaml.contains("c2VjcmV0"));
    }
}

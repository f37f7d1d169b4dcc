//! Name based exclusion of directory entries.
//!
//! A rule is either a literal entry name (`node_modules`) or a suffix
//! wildcard (`*.log`). Rules only ever look at the entry's own name, never
//! at its path, so a nested `build` file is excluded exactly like a
//! top-level `build` directory.

use crate::backup::validate::validate_rule_name;

use getset::Getters;
use serde::de::Visitor;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use validator::ValidationError;

use std::ffi::OsStr;
use std::fmt::{Display, Formatter};
use std::result;
use std::str::FromStr;
use std::sync::Arc;

const SUFFIX_PREFIX: &str = "*.";

/// A single exclusion rule.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ExclusionRule {
    /// Matches an entry whose name is exactly this string.
    Exact(Arc<str>),
    /// Matches an entry whose name ends with this suffix. The suffix keeps
    /// its leading dot, `*.log` is stored as `.log`.
    Suffix(Arc<str>),
}

impl ExclusionRule {
    pub fn exact<S: Into<Arc<str>>>(name: S) -> Self {
        Self::Exact(name.into())
    }

    /// Builds a `*.<ext>` rule from the bare extension.
    pub fn suffix<S: AsRef<str>>(ext: S) -> Self {
        Self::Suffix(format!(".{}", ext.as_ref()).into())
    }

    pub fn matches<N: AsRef<OsStr> + ?Sized>(&self, name: &N) -> bool {
        let name = name.as_ref().as_encoded_bytes();
        match self {
            ExclusionRule::Exact(exact) => name == exact.as_bytes(),
            ExclusionRule::Suffix(suffix) => {
                name.len() >= suffix.len() && name.ends_with(suffix.as_bytes())
            }
        }
    }
}

impl Display for ExclusionRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ExclusionRule::Exact(exact) => f.write_str(exact),
            ExclusionRule::Suffix(suffix) => write!(f, "*{suffix}"),
        }
    }
}

impl FromStr for ExclusionRule {
    type Err = ValidationError;

    fn from_str(s: &str) -> result::Result<Self, Self::Err> {
        match s.strip_prefix(SUFFIX_PREFIX) {
            Some(ext) => validate_rule_name(ext).map(|_| Self::suffix(ext)),
            None => validate_rule_name(s).map(|_| Self::exact(s)),
        }
    }
}

impl Serialize for ExclusionRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct ExclusionRuleVisitor;

impl Visitor<'_> for ExclusionRuleVisitor {
    type Value = ExclusionRule;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("an entry name or a `*.ext` pattern")
    }

    fn visit_str<E>(self, v: &str) -> result::Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        v.parse().map_err(serde::de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for ExclusionRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> result::Result<Self, D::Error> {
        deserializer.deserialize_str(ExclusionRuleVisitor)
    }
}

/// Rules applied when the configuration does not name any.
pub fn default_rules() -> Vec<ExclusionRule> {
    vec![
        ExclusionRule::exact("node_modules"),
        ExclusionRule::exact("project_backups"),
        ExclusionRule::exact(".git"),
        ExclusionRule::exact("buildZip"),
        ExclusionRule::exact(".cache"),
        ExclusionRule::exact("dist"),
        ExclusionRule::exact("build"),
        ExclusionRule::exact(".vscode"),
        ExclusionRule::exact(".idea"),
        ExclusionRule::suffix("tmp"),
        ExclusionRule::suffix("log"),
        ExclusionRule::exact("__pycache__"),
        ExclusionRule::exact(".pytest_cache"),
        ExclusionRule::exact("Suwayomi-Server"),
        ExclusionRule::exact("manga-image-translator"),
        ExclusionRule::suffix("pyc"),
        ExclusionRule::exact(".DS_Store"),
    ]
}

/// Checks rules that were built in code rather than parsed.
pub fn validate_rules(rules: &[ExclusionRule]) -> result::Result<(), ValidationError> {
    rules.iter().try_for_each(|rule| match rule {
        ExclusionRule::Exact(name) => validate_rule_name(name),
        ExclusionRule::Suffix(suffix) => validate_rule_name(suffix.trim_start_matches('.')),
    })
}

/// Ordered, immutable set of rules consulted for every entry of a run.
#[derive(Clone, Debug, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct ExclusionMatcher {
    rules: Arc<[ExclusionRule]>,
}

impl ExclusionMatcher {
    pub fn new<R: Into<Arc<[ExclusionRule]>>>(rules: R) -> Self {
        Self {
            rules: rules.into(),
        }
    }

    /// First rule matching `name`, in configuration order.
    pub fn first_match<N: AsRef<OsStr> + ?Sized>(&self, name: &N) -> Option<&ExclusionRule> {
        self.rules.iter().find(|rule| rule.matches(name))
    }

    pub fn should_exclude<N: AsRef<OsStr> + ?Sized>(&self, name: &N) -> bool {
        self.first_match(name).is_some()
    }
}

impl Default for ExclusionMatcher {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

//! The rule evaluator (spec §4.2): ordered `allow`/`disallow` rules over an
//! OS/arch/feature predicate, last-match-wins, default disallow.

use std::collections::HashMap;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::platform::Os;

static REGEX_CACHE: Lazy<Mutex<HashMap<String, Regex>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Compile `pattern` once and cache it; subsequent calls with the same
/// pattern are a hash lookup, per spec §9 ("regexes ... must be compiled
/// once and cached").
fn cached_regex(pattern: &str) -> Option<Regex> {
    let mut cache = REGEX_CACHE.lock().unwrap();
    if let Some(re) = cache.get(pattern) {
        return Some(re.clone());
    }
    match Regex::new(pattern) {
        Ok(re) => {
            cache.insert(pattern.to_string(), re.clone());
            Some(re)
        }
        Err(_) => None,
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RulePlatform {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Os>,
    /// Regex over the OS version string (e.g. `^10\.`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Regex over the architecture token (e.g. `^x86$`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EnvRule {
    pub action: RuleAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<RulePlatform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<HashMap<String, bool>>,
}

/// The feature keys an installer supplies for a given run (`is_demo_user`,
/// `has_custom_resolution`, `has_quick_plays_support`,
/// `is_quick_play_singleplayer`, ...).
#[derive(Debug, Clone, Default)]
pub struct FeatureSet(HashMap<String, bool>);

impl FeatureSet {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn with(mut self, key: impl Into<String>, value: bool) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: bool) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> bool {
        self.0.get(key).copied().unwrap_or(false)
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }
}

/// The platform facts a predicate is evaluated against.
#[derive(Debug, Clone)]
pub struct PlatformFacts {
    pub os: Os,
    pub os_version: String,
    pub arch: String,
}

fn matches_platform(rule_os: &RulePlatform, facts: &PlatformFacts) -> bool {
    if let Some(name) = rule_os.name {
        if name != facts.os {
            return false;
        }
    }
    if let Some(version_pattern) = &rule_os.version {
        match cached_regex(version_pattern) {
            Some(re) if re.is_match(&facts.os_version) => {}
            _ => return false,
        }
    }
    if let Some(arch_pattern) = &rule_os.arch {
        match cached_regex(arch_pattern) {
            Some(re) if re.is_match(&facts.arch) => {}
            _ => return false,
        }
    }
    true
}

fn matches_features(required: &HashMap<String, bool>, features: &FeatureSet) -> bool {
    required
        .iter()
        .all(|(key, expected)| features.get(key) == *expected)
}

fn rule_matches(rule: &EnvRule, facts: &PlatformFacts, features: &FeatureSet) -> bool {
    if let Some(os) = &rule.os {
        if !matches_platform(os, facts) {
            return false;
        }
    }
    if let Some(required) = &rule.features {
        if !matches_features(required, features) {
            return false;
        }
    }
    true
}

/// Evaluate an ordered rule list; default `disallow`, last matching rule
/// wins. An empty or absent rule list always allows (spec §4.2 only gates
/// inclusion when rules are present).
pub fn evaluate(rules: &[EnvRule], facts: &PlatformFacts, features: &FeatureSet) -> bool {
    if rules.is_empty() {
        return true;
    }
    let mut allowed = false;
    for rule in rules {
        if rule_matches(rule, facts, features) {
            allowed = rule.action == RuleAction::Allow;
        }
    }
    allowed
}

pub fn evaluate_optional(
    rules: &Option<Vec<EnvRule>>,
    facts: &PlatformFacts,
    features: &FeatureSet,
) -> bool {
    match rules {
        Some(rules) => evaluate(rules, facts, features),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts() -> PlatformFacts {
        PlatformFacts {
            os: Os::Linux,
            os_version: "6.1.0".to_string(),
            arch: "x86_64".to_string(),
        }
    }

    #[test]
    fn empty_rules_allow() {
        assert!(evaluate(&[], &facts(), &FeatureSet::new()));
    }

    #[test]
    fn no_matching_rule_disallows() {
        let rules = vec![EnvRule {
            action: RuleAction::Allow,
            os: Some(RulePlatform {
                name: Some(Os::Windows),
                version: None,
                arch: None,
            }),
            features: None,
        }];
        assert!(!evaluate(&rules, &facts(), &FeatureSet::new()));
    }

    #[test]
    fn last_match_wins() {
        let rules = vec![
            EnvRule {
                action: RuleAction::Allow,
                os: None,
                features: None,
            },
            EnvRule {
                action: RuleAction::Disallow,
                os: Some(RulePlatform {
                    name: Some(Os::Linux),
                    version: None,
                    arch: None,
                }),
                features: None,
            },
        ];
        assert!(!evaluate(&rules, &facts(), &FeatureSet::new()));
    }

    #[test]
    fn os_version_regex_matches() {
        let rules = vec![EnvRule {
            action: RuleAction::Allow,
            os: Some(RulePlatform {
                name: None,
                version: Some(r"^6\.".to_string()),
                arch: None,
            }),
            features: None,
        }];
        assert!(evaluate(&rules, &facts(), &FeatureSet::new()));
    }

    #[test]
    fn feature_gate() {
        let rules = vec![EnvRule {
            action: RuleAction::Allow,
            os: None,
            features: Some(HashMap::from([("is_demo_user".to_string(), true)])),
        }];
        assert!(!evaluate(&rules, &facts(), &FeatureSet::new()));
        assert!(evaluate(
            &rules,
            &facts(),
            &FeatureSet::new().with("is_demo_user", true)
        ));
    }

    #[test]
    fn idempotent_for_fixed_inputs() {
        let rules = vec![EnvRule {
            action: RuleAction::Disallow,
            os: Some(RulePlatform {
                name: Some(Os::Windows),
                version: None,
                arch: None,
            }),
            features: None,
        }];
        let f = facts();
        let features = FeatureSet::new();
        let first = evaluate(&rules, &f, &features);
        let second = evaluate(&rules, &f, &features);
        assert_eq!(first, second);
    }
}

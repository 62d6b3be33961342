//! Pipeline rule table - which stages feed which.
//!
//! Each task type declares an ordered chain of upstream candidates on its
//! own entity and, for shot stages, the preference order used to pick a
//! deliverable from every linked asset.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use pipedeps_core::TaskType;
use serde::{Deserialize, Serialize};

/// Errors raised while building or loading a rule table.
#[derive(Debug, thiserror::Error)]
pub enum RuleTableError {
    /// A chain names the same candidate twice
    #[error("rule for {task_type} lists {candidate} more than once")]
    DuplicateCandidate {
        /// Rule being checked
        task_type: TaskType,
        /// Repeated candidate
        candidate: TaskType,
    },

    /// A rule lists its own type upstream
    #[error("rule for {0} lists itself as an upstream stage")]
    SelfDependency(TaskType),

    /// Upstream chains loop back on themselves
    #[error("upstream cycle: {}", format_path(.0))]
    Cycle(Vec<TaskType>),

    /// Linked assets requested with nothing to look up on them
    #[error("rule for {0} needs linked assets but has an empty asset preference chain")]
    EmptyAssetChain(TaskType),

    /// Rule file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Rule file could not be parsed
    #[error("invalid rule file: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_path(path: &[TaskType]) -> String {
    path.iter().map(TaskType::as_str).collect::<Vec<_>>().join(" -> ")
}

/// Dependency rule for one task type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Upstream candidates on the same entity, most preferred first
    #[serde(default)]
    pub upstream_chain: Vec<TaskType>,

    /// Whether the deliverables of a shot's linked assets are needed
    #[serde(default)]
    pub needs_linked_assets: bool,

    /// Candidates looked up on each linked asset, most preferred first
    #[serde(default)]
    pub asset_preference_chain: Vec<TaskType>,
}

impl Rule {
    /// Rule with an upstream chain only.
    pub fn upstream(chain: &[&'static str]) -> Self {
        Self {
            upstream_chain: chain.iter().copied().map(TaskType::known).collect(),
            ..Self::default()
        }
    }

    /// Also pull the given stages from every linked asset.
    pub fn with_linked_assets(mut self, preference: &[&'static str]) -> Self {
        self.needs_linked_assets = true;
        self.asset_preference_chain = preference.iter().copied().map(TaskType::known).collect();
        self
    }
}

/// Immutable, validated mapping from task type to rule.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<(TaskType, Rule)>,
    index: HashMap<TaskType, usize>,
}

/// Asset stages a shot stage prefers to consume.
const SHOT_ASSET_PREFERENCE: &[&str] = &["Rig", "Modeling"];

impl RuleTable {
    /// The production pipeline's built-in rules.
    pub fn pipeline() -> Self {
        let rules = [
            ("Art", Rule::upstream(&[])),
            ("Modeling", Rule::upstream(&["Art"])),
            ("Rig", Rule::upstream(&["Modeling"])),
            ("Surfacing", Rule::upstream(&["Modeling"])),
            ("Layout", Rule::upstream(&[]).with_linked_assets(SHOT_ASSET_PREFERENCE)),
            ("Animation", Rule::upstream(&["Layout"]).with_linked_assets(SHOT_ASSET_PREFERENCE)),
            ("Lighting", Rule::upstream(&["Animation", "Layout"]).with_linked_assets(SHOT_ASSET_PREFERENCE)),
            ("FX", Rule::upstream(&["Animation", "Layout"]).with_linked_assets(SHOT_ASSET_PREFERENCE)),
            ("Render", Rule::upstream(&["Lighting"]).with_linked_assets(SHOT_ASSET_PREFERENCE)),
            ("Comp", Rule::upstream(&["Render", "Lighting"]).with_linked_assets(SHOT_ASSET_PREFERENCE)),
        ];
        let table = Self::build(rules.into_iter().map(|(name, rule)| (TaskType::known(name), rule)));
        debug_assert!(table.validate().is_ok(), "built-in pipeline rules are invalid");
        table
    }

    /// Build and validate a table.
    pub fn new(rules: impl IntoIterator<Item = (TaskType, Rule)>) -> Result<Self, RuleTableError> {
        let table = Self::build(rules);
        table.validate()?;
        Ok(table)
    }

    /// Parse a JSON object of `task type -> rule` and validate it.
    ///
    /// Keys go through the label normalizer, so `"005_Lighting"` and
    /// `"Lighting"` name the same rule.
    pub fn from_json(json: &str) -> Result<Self, RuleTableError> {
        let rules: BTreeMap<TaskType, Rule> = serde_json::from_str(json)?;
        Self::new(rules)
    }

    /// Read a JSON rule file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, RuleTableError> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }

    fn build(rules: impl IntoIterator<Item = (TaskType, Rule)>) -> Self {
        let mut table = Self { rules: Vec::new(), index: HashMap::new() };
        for (task_type, rule) in rules {
            match table.index.get(&task_type) {
                Some(&slot) => table.rules[slot].1 = rule,
                None => {
                    table.index.insert(task_type.clone(), table.rules.len());
                    table.rules.push((task_type, rule));
                }
            }
        }
        table
    }

    /// Rule for a normalized task type.
    pub fn get(&self, task_type: &TaskType) -> Option<&Rule> {
        self.index.get(task_type).map(|&slot| &self.rules[slot].1)
    }

    /// Whether a rule exists for the type.
    pub fn contains(&self, task_type: &TaskType) -> bool {
        self.index.contains_key(task_type)
    }

    /// Rules in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&TaskType, &Rule)> {
        self.rules.iter().map(|(t, r)| (t, r))
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the table has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Check chains for repeats, self references and upstream cycles.
    ///
    /// Chains may name types without a rule of their own; those are leaves.
    pub fn validate(&self) -> Result<(), RuleTableError> {
        for (task_type, rule) in &self.rules {
            for chain in [&rule.upstream_chain, &rule.asset_preference_chain] {
                for (i, candidate) in chain.iter().enumerate() {
                    if chain[..i].contains(candidate) {
                        return Err(RuleTableError::DuplicateCandidate {
                            task_type: task_type.clone(),
                            candidate: candidate.clone(),
                        });
                    }
                }
            }
            if rule.upstream_chain.contains(task_type) {
                return Err(RuleTableError::SelfDependency(task_type.clone()));
            }
            if rule.needs_linked_assets && rule.asset_preference_chain.is_empty() {
                return Err(RuleTableError::EmptyAssetChain(task_type.clone()));
            }
        }

        let mut state = vec![Visit::New; self.rules.len()];
        let mut path = Vec::new();
        for slot in 0..self.rules.len() {
            self.visit(slot, &mut state, &mut path)?;
        }
        Ok(())
    }

    fn visit(&self, slot: usize, state: &mut [Visit], path: &mut Vec<TaskType>) -> Result<(), RuleTableError> {
        let (task_type, rule) = &self.rules[slot];
        match state[slot] {
            Visit::Done => return Ok(()),
            Visit::Active => {
                let start = path.iter().position(|t| t == task_type).unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(task_type.clone());
                return Err(RuleTableError::Cycle(cycle));
            }
            Visit::New => {}
        }

        state[slot] = Visit::Active;
        path.push(task_type.clone());
        for upstream in &rule.upstream_chain {
            if let Some(&next) = self.index.get(upstream) {
                self.visit(next, state, path)?;
            }
        }
        path.pop();
        state[slot] = Visit::Done;
        Ok(())
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::pipeline()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Active,
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(name: &str) -> TaskType {
        TaskType::parse(name).unwrap()
    }

    #[test]
    fn pipeline_table_is_valid() {
        let table = RuleTable::pipeline();
        table.validate().unwrap();
        assert_eq!(table.len(), 10);
    }

    #[test]
    fn pipeline_rules_match_declared_chains() {
        let table = RuleTable::pipeline();

        let art = table.get(&ty("Art")).unwrap();
        assert!(art.upstream_chain.is_empty());
        assert!(!art.needs_linked_assets);

        let lighting = table.get(&ty("Lighting")).unwrap();
        assert_eq!(lighting.upstream_chain, vec![ty("Animation"), ty("Layout")]);
        assert!(lighting.needs_linked_assets);
        assert_eq!(lighting.asset_preference_chain, vec![ty("Rig"), ty("Modeling")]);

        let comp = table.get(&ty("Comp")).unwrap();
        assert_eq!(comp.upstream_chain, vec![ty("Render"), ty("Lighting")]);

        let layout = table.get(&ty("Layout")).unwrap();
        assert!(layout.upstream_chain.is_empty());
        assert!(layout.needs_linked_assets);

        assert!(table.get(&ty("Texture")).is_none());
    }

    #[test]
    fn iteration_keeps_declaration_order() {
        let names: Vec<_> = RuleTable::pipeline().iter().map(|(t, _)| t.to_string()).collect();
        assert_eq!(names.first().map(String::as_str), Some("Art"));
        assert_eq!(names.last().map(String::as_str), Some("Comp"));
    }

    #[test]
    fn rejects_upstream_cycles() {
        let err = RuleTable::new([
            (ty("Layout"), Rule::upstream(&["Animation"])),
            (ty("Animation"), Rule::upstream(&["Lighting"])),
            (ty("Lighting"), Rule::upstream(&["Layout"])),
        ])
        .unwrap_err();

        match err {
            RuleTableError::Cycle(path) => {
                assert_eq!(path.first(), path.last());
                assert_eq!(path.len(), 4);
            }
            other => panic!("expected cycle, got {other}"),
        }
    }

    #[test]
    fn rejects_self_reference_and_repeats() {
        let err = RuleTable::new([(ty("Comp"), Rule::upstream(&["Comp"]))]).unwrap_err();
        assert!(matches!(err, RuleTableError::SelfDependency(_)));

        let err = RuleTable::new([(ty("FX"), Rule::upstream(&["Layout", "Layout"]))]).unwrap_err();
        assert!(matches!(err, RuleTableError::DuplicateCandidate { .. }));

        let rule = Rule { needs_linked_assets: true, ..Rule::default() };
        let err = RuleTable::new([(ty("Layout"), rule)]).unwrap_err();
        assert!(matches!(err, RuleTableError::EmptyAssetChain(_)));
    }

    #[test]
    fn parses_json_rules_with_prefixed_keys() {
        let json = r#"{
            "005_Lighting": {
                "upstream_chain": ["Animation", "Layout"],
                "needs_linked_assets": true,
                "asset_preference_chain": ["Rig"]
            },
            "Art": {}
        }"#;
        let table = RuleTable::from_json(json).unwrap();

        let lighting = table.get(&ty("Lighting")).unwrap();
        assert_eq!(lighting.asset_preference_chain, vec![ty("Rig")]);
        assert_eq!(table.get(&ty("Art")), Some(&Rule::default()));
    }

    #[test]
    fn rejects_json_with_unnamed_task_type() {
        let err = RuleTable::from_json(r#"{"007_": {}}"#).unwrap_err();
        assert!(matches!(err, RuleTableError::Json(_)));
    }

    #[tokio::test]
    async fn loads_rule_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"{"Rig": {"upstream_chain": ["Modeling"]}}"#).unwrap();

        let table = RuleTable::load(&path).await.unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.contains(&ty("Rig")));
    }
}

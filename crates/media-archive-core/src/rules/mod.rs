pub mod template;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::config::AppConfig;
use crate::error::Error;
use template::{Template, TemplateContext, TemplateError};

/// Compile a pattern so that it only matches at the start of the input,
/// mirroring "match from start" semantics without anchoring the end.
pub(crate) fn compile_anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"\A(?:{})", pattern))
}

// ── Raw configuration ───────────────────────────────────────────

/// A classification rule as written in the configuration file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleSpec {
    pub pattern: String,
    pub source: String,
    /// Capture group holding the logical id. Defaults to 1.
    #[serde(default)]
    pub group: Option<usize>,
    /// Capture group (index or name) → metadata field name.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenameRuleSpec {
    pub pattern: String,
    pub template: String,
}

// ── Compiled rules ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum GroupRef {
    Index(usize),
    Name(String),
}

/// What a classification rule extracted from a base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub source: String,
    pub id: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    NoMatch,
    Identified(Identity),
    /// The pattern matched but the id group did not participate.
    MissingId,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Regex,
    raw: String,
    source: String,
    id_group: usize,
    metadata_fields: Vec<(GroupRef, String)>,
}

impl Rule {
    pub fn compile(spec: &RuleSpec) -> Result<Self, Error> {
        let pattern = compile_anchored(&spec.pattern).map_err(|e| Error::rule(&spec.pattern, e))?;
        let group_count = pattern.captures_len() - 1;
        let id_group = spec.group.unwrap_or(1);
        if id_group > group_count {
            return Err(Error::rule(
                &spec.pattern,
                format!("id group {} out of range ({} groups)", id_group, group_count),
            ));
        }

        let names: BTreeSet<&str> = pattern.capture_names().flatten().collect();
        let mut metadata_fields = Vec::with_capacity(spec.metadata.len());
        for (group, field) in &spec.metadata {
            let group_ref = match group.parse::<usize>() {
                Ok(index) if index <= group_count => GroupRef::Index(index),
                Ok(index) => {
                    return Err(Error::rule(
                        &spec.pattern,
                        format!("metadata group {} out of range ({} groups)", index, group_count),
                    ))
                }
                Err(_) if names.contains(group.as_str()) => GroupRef::Name(group.clone()),
                Err(_) => {
                    return Err(Error::rule(
                        &spec.pattern,
                        format!("metadata group '{}' is not defined", group),
                    ))
                }
            };
            metadata_fields.push((group_ref, field.clone()));
        }

        Ok(Self {
            pattern,
            raw: spec.pattern.clone(),
            source: spec.source.clone(),
            id_group,
            metadata_fields,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.raw
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn identify(&self, base_name: &str) -> RuleOutcome {
        let captures = match self.pattern.captures(base_name) {
            Some(c) => c,
            None => return RuleOutcome::NoMatch,
        };
        let id = match captures.get(self.id_group) {
            Some(m) => m.as_str().to_string(),
            None => return RuleOutcome::MissingId,
        };

        let mut metadata = BTreeMap::new();
        for (group, field) in &self.metadata_fields {
            let value = match group {
                GroupRef::Index(i) => captures.get(*i),
                GroupRef::Name(n) => captures.name(n),
            };
            if let Some(v) = value {
                metadata.insert(field.clone(), v.as_str().to_string());
            }
        }

        RuleOutcome::Identified(Identity {
            source: self.source.clone(),
            id,
            metadata,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExcludeSet {
    patterns: Vec<Regex>,
}

impl ExcludeSet {
    pub fn compile(patterns: &[String]) -> Result<Self, Error> {
        let patterns = patterns
            .iter()
            .map(|p| compile_anchored(p).map_err(|e| Error::rule(p, e)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_excluded(&self, base_name: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(base_name))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Ordered classification rules plus the exclude set applied before them.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
    excludes: ExcludeSet,
}

impl RuleTable {
    pub fn compile(specs: &[RuleSpec], excludes: &[String]) -> Result<Self, Error> {
        let rules = specs.iter().map(Rule::compile).collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            rules,
            excludes: ExcludeSet::compile(excludes)?,
        })
    }

    pub fn excludes(&self) -> &ExcludeSet {
        &self.excludes
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// First rule whose pattern matches decides the outcome.
    pub fn identify(&self, base_name: &str) -> RuleOutcome {
        for rule in &self.rules {
            match rule.identify(base_name) {
                RuleOutcome::NoMatch => continue,
                outcome => return outcome,
            }
        }
        RuleOutcome::NoMatch
    }
}

#[derive(Debug, Clone)]
pub struct RenameRule {
    pattern: Regex,
    template: Template,
}

impl RenameRule {
    pub fn compile(spec: &RenameRuleSpec) -> Result<Self, Error> {
        let pattern = compile_anchored(&spec.pattern).map_err(|e| Error::rule(&spec.pattern, e))?;
        let template = Template::parse(&spec.template).map_err(|e| Error::rule(&spec.template, e))?;
        Ok(Self { pattern, template })
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// `None` when the pattern does not match, otherwise the rendered base name.
    pub fn rename(
        &self,
        base_name: &str,
        extension: Option<&str>,
    ) -> Option<Result<String, TemplateError>> {
        let captures = self.pattern.captures(base_name)?;
        let context = TemplateContext::from_captures(&self.pattern, &captures)
            .with_filename(base_name, extension);
        Some(self.template.render(&context))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenameTable {
    rules: Vec<RenameRule>,
    excludes: ExcludeSet,
}

impl RenameTable {
    pub fn compile(specs: &[RenameRuleSpec], excludes: &[String]) -> Result<Self, Error> {
        let rules = specs
            .iter()
            .map(RenameRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            rules,
            excludes: ExcludeSet::compile(excludes)?,
        })
    }

    pub fn excludes(&self) -> &ExcludeSet {
        &self.excludes
    }

    pub fn rename(
        &self,
        base_name: &str,
        extension: Option<&str>,
    ) -> Option<Result<String, TemplateError>> {
        self.rules
            .iter()
            .find_map(|rule| rule.rename(base_name, extension))
    }
}

/// Allowed file extensions; `None` allows every file.
#[derive(Debug, Clone, Default)]
pub struct ExtensionFilter {
    allowed: Option<BTreeSet<String>>,
}

impl ExtensionFilter {
    pub fn new(allowed: Option<&[String]>) -> Self {
        Self {
            allowed: allowed.map(|list| list.iter().cloned().collect()),
        }
    }

    pub fn allows(&self, extension: Option<&str>) -> bool {
        match (&self.allowed, extension) {
            (None, _) => true,
            (Some(set), Some(ext)) => set.contains(ext),
            (Some(_), None) => false,
        }
    }
}

/// All compiled rules of one configuration. Compilation is all-or-nothing.
#[derive(Debug, Clone, Default)]
pub struct RuleBook {
    pub classification: RuleTable,
    pub rename: RenameTable,
    pub extensions: ExtensionFilter,
}

impl RuleBook {
    pub fn compile(config: &AppConfig) -> Result<Self, Error> {
        let classification = RuleTable::compile(&config.save.rules, &config.save.excludes)?;
        let rename = RenameTable::compile(&config.rename.rules, &config.rename.excludes)?;
        debug!(
            "Compiled {} classification rules, {} rename rules",
            classification.rules.len(),
            rename.rules.len()
        );
        Ok(Self {
            classification,
            rename,
            extensions: ExtensionFilter::new(config.supported_extensions.as_deref()),
        })
    }
}

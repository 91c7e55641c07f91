//! Reference taxonomy: goals, their sub-targets, and their sub-indicators.
//!
//! Source files mirror the nested SDG records (`sdg_no`, `title`,
//! `content`, `targets[]`, `indicators[]`). They are deserialized into
//! permissive raw records first and then converted into the typed
//! [`Goal`] / [`Target`] / [`Indicator`] values, so a missing or blank
//! field is reported as [`MatchError::Validation`] with the exact path
//! instead of surfacing later as a hole in the ranking output.
//!
//! Order is preserved everywhere: it is the order in which the flattener
//! emits statements and therefore the tie-break order of the ranker.

use anyhow::{bail, Context};
use serde::Deserialize;
use std::path::Path;

use crate::error::{MatchError, Result};

/// The sample taxonomy bundled with the binary.
const BUILTIN_TAXONOMY: &str = include_str!("../data/sdg.json");

/// An ordered, validated set of goals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taxonomy {
    goals: Vec<Goal>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Goal {
    number: u32,
    title: String,
    content: String,
    targets: Vec<Target>,
    indicators: Vec<Indicator>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    number: String,
    description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indicator {
    number: String,
    description: String,
}

impl Taxonomy {
    /// Build a taxonomy from already-constructed goals.
    ///
    /// Fails if `goals` is empty.
    pub fn new(goals: Vec<Goal>) -> Result<Self> {
        if goals.is_empty() {
            return Err(MatchError::validation(
                "goals",
                "taxonomy must contain at least one goal",
            ));
        }
        Ok(Self { goals })
    }

    /// The sample taxonomy shipped in `data/sdg.json`.
    pub fn builtin() -> anyhow::Result<Self> {
        Self::from_json_str(BUILTIN_TAXONOMY).context("Failed to parse bundled taxonomy")
    }

    /// Load a taxonomy file, choosing the format by extension
    /// (`.json` or `.toml`).
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read taxonomy file: {}", path.display()))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            Some("toml") => Self::from_toml_str(&content),
            _ => bail!(
                "Unsupported taxonomy format: {} (expected .json or .toml)",
                path.display()
            ),
        }
        .with_context(|| format!("Failed to load taxonomy: {}", path.display()))
    }

    /// Parse JSON: either a bare array of goals or `{ "goals": [...] }`.
    pub fn from_json_str(s: &str) -> anyhow::Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(s).context("Failed to parse taxonomy JSON")?;
        let raw = if value.is_array() {
            RawTaxonomy {
                goals: serde_json::from_value(value).context("Failed to parse taxonomy JSON")?,
            }
        } else {
            serde_json::from_value(value).context("Failed to parse taxonomy JSON")?
        };
        Ok(Self::from_raw(raw)?)
    }

    /// Parse TOML with one `[[goals]]` table per goal.
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let raw: RawTaxonomy = toml::from_str(s).context("Failed to parse taxonomy TOML")?;
        Ok(Self::from_raw(raw)?)
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn target_count(&self) -> usize {
        self.goals.iter().map(|g| g.targets.len()).sum()
    }

    pub fn indicator_count(&self) -> usize {
        self.goals.iter().map(|g| g.indicators.len()).sum()
    }

    /// Number of statements the flattener will emit.
    pub fn statement_count(&self) -> usize {
        self.goals.len() + self.target_count() + self.indicator_count()
    }

    fn from_raw(raw: RawTaxonomy) -> Result<Self> {
        let goals = raw
            .goals
            .into_iter()
            .enumerate()
            .map(|(i, g)| g.into_goal(&format!("goals[{}]", i)))
            .collect::<Result<Vec<_>>>()?;
        Self::new(goals)
    }
}

impl Goal {
    pub fn new(number: u32, title: &str, content: &str) -> Result<Self> {
        let path = format!("goal {}", number);
        Ok(Self {
            number,
            title: required(Some(title.to_string()), &format!("{}.title", path))?,
            content: required(Some(content.to_string()), &format!("{}.content", path))?,
            targets: Vec::new(),
            indicators: Vec::new(),
        })
    }

    pub fn with_target(mut self, number: &str, description: &str) -> Result<Self> {
        let path = format!("goal {}.targets[{}]", self.number, self.targets.len());
        self.targets.push(Target {
            number: required(Some(number.to_string()), &format!("{}.target_no", path))?,
            description: required(
                Some(description.to_string()),
                &format!("{}.description", path),
            )?,
        });
        Ok(self)
    }

    pub fn with_indicator(mut self, number: &str, description: &str) -> Result<Self> {
        let path = format!("goal {}.indicators[{}]", self.number, self.indicators.len());
        self.indicators.push(Indicator {
            number: required(Some(number.to_string()), &format!("{}.indicator_no", path))?,
            description: required(
                Some(description.to_string()),
                &format!("{}.description", path),
            )?,
        });
        Ok(self)
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn indicators(&self) -> &[Indicator] {
        &self.indicators
    }
}

impl Target {
    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl Indicator {
    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

// ============ Raw source records ============

#[derive(Debug, Deserialize)]
struct RawTaxonomy {
    #[serde(default)]
    goals: Vec<RawGoal>,
}

#[derive(Debug, Deserialize)]
struct RawGoal {
    #[serde(alias = "goal_id")]
    sdg_no: Option<u32>,
    title: Option<String>,
    content: Option<String>,
    #[serde(default)]
    targets: Vec<RawTarget>,
    #[serde(default)]
    indicators: Vec<RawIndicator>,
}

#[derive(Debug, Deserialize)]
struct RawTarget {
    target_no: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawIndicator {
    indicator_no: Option<String>,
    description: Option<String>,
}

impl RawGoal {
    fn into_goal(self, path: &str) -> Result<Goal> {
        let number = self
            .sdg_no
            .ok_or_else(|| MatchError::validation(format!("{}.sdg_no", path), "missing"))?;
        let title = required(self.title, &format!("{}.title", path))?;
        let content = required(self.content, &format!("{}.content", path))?;

        let targets = self
            .targets
            .into_iter()
            .enumerate()
            .map(|(i, t)| {
                let path = format!("{}.targets[{}]", path, i);
                Ok(Target {
                    number: required(t.target_no, &format!("{}.target_no", path))?,
                    description: required(t.description, &format!("{}.description", path))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let indicators = self
            .indicators
            .into_iter()
            .enumerate()
            .map(|(i, ind)| {
                let path = format!("{}.indicators[{}]", path, i);
                Ok(Indicator {
                    number: required(ind.indicator_no, &format!("{}.indicator_no", path))?,
                    description: required(ind.description, &format!("{}.description", path))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Goal {
            number,
            title,
            content,
            targets,
            indicators,
        })
    }
}

/// The value exactly as written, or a validation error naming `path` when
/// it is absent or whitespace-only.
fn required(value: Option<String>, path: &str) -> Result<String> {
    match value {
        None => Err(MatchError::validation(path, "missing")),
        Some(v) if v.trim().is_empty() => Err(MatchError::validation(path, "must not be blank")),
        Some(v) => Ok(v),
    }
}

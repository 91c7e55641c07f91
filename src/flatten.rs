//! Flatten a [`Taxonomy`] into an ordered list of [`ReferenceStatement`]s.
//!
//! For each goal, in taxonomy order: the goal itself, then its sub-targets,
//! then its sub-indicators. The statement texts are what gets embedded, so
//! their wording must stay byte-identical across runs:
//!
//! ```text
//! SDG 2 Zero Hunger End hunger, achieve food security, ...
//! SDG 2 Target 2.1 By 2030, end hunger and ensure access to ...
//! SDG 2 Indicator 2.2.1 Prevalence of stunting among children under 5
//! ```

use serde::Serialize;

use crate::taxonomy::Taxonomy;

/// Hierarchy level of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Level {
    #[serde(rename = "goal")]
    Goal,
    #[serde(rename = "target")]
    SubTarget,
    #[serde(rename = "indicator")]
    SubIndicator,
}

impl Level {
    /// Wire name used in exports: `goal`, `target`, or `indicator`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Goal => "goal",
            Level::SubTarget => "target",
            Level::SubIndicator => "indicator",
        }
    }

    /// Capitalized label for human-readable output.
    pub fn label(&self) -> &'static str {
        match self {
            Level::Goal => "Goal",
            Level::SubTarget => "Target",
            Level::SubIndicator => "Indicator",
        }
    }
}

/// Level-specific identity of a statement.
///
/// Each variant carries exactly the identifier its level has, so a target
/// can never lack a target number and a goal can never carry one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    Goal { title: String },
    SubTarget { target_no: String },
    SubIndicator { indicator_no: String },
}

/// One embeddable leaf of the taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceStatement {
    goal_id: u32,
    kind: StatementKind,
    text: String,
}

impl ReferenceStatement {
    pub fn goal_id(&self) -> u32 {
        self.goal_id
    }

    pub fn kind(&self) -> &StatementKind {
        &self.kind
    }

    pub fn level(&self) -> Level {
        match self.kind {
            StatementKind::Goal { .. } => Level::Goal,
            StatementKind::SubTarget { .. } => Level::SubTarget,
            StatementKind::SubIndicator { .. } => Level::SubIndicator,
        }
    }

    /// Goal title; only goal-level statements carry one.
    pub fn title(&self) -> Option<&str> {
        match &self.kind {
            StatementKind::Goal { title } => Some(title),
            _ => None,
        }
    }

    pub fn sub_target_id(&self) -> Option<&str> {
        match &self.kind {
            StatementKind::SubTarget { target_no } => Some(target_no),
            _ => None,
        }
    }

    pub fn sub_indicator_id(&self) -> Option<&str> {
        match &self.kind {
            StatementKind::SubIndicator { indicator_no } => Some(indicator_no),
            _ => None,
        }
    }

    /// The exact text that was embedded for this statement.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Flatten `taxonomy` into statements in emission order.
///
/// Pure and infallible: [`Taxonomy`] values are validated when they are
/// constructed, so every required field is already present here.
pub fn flatten(taxonomy: &Taxonomy) -> Vec<ReferenceStatement> {
    let mut out = Vec::with_capacity(taxonomy.statement_count());

    for goal in taxonomy.goals() {
        let n = goal.number();

        out.push(ReferenceStatement {
            goal_id: n,
            kind: StatementKind::Goal {
                title: goal.title().to_string(),
            },
            text: format!("SDG {} {} {}", n, goal.title(), goal.content()),
        });

        for target in goal.targets() {
            out.push(ReferenceStatement {
                goal_id: n,
                kind: StatementKind::SubTarget {
                    target_no: target.number().to_string(),
                },
                text: format!(
                    "SDG {} Target {} {}",
                    n,
                    target.number(),
                    target.description()
                ),
            });
        }

        for indicator in goal.indicators() {
            out.push(ReferenceStatement {
                goal_id: n,
                kind: StatementKind::SubIndicator {
                    indicator_no: indicator.number().to_string(),
                },
                text: format!(
                    "SDG {} Indicator {} {}",
                    n,
                    indicator.number(),
                    indicator.description()
                ),
            });
        }
    }

    out
}

/// The embeddable texts of `statements`, in order.
pub fn texts(statements: &[ReferenceStatement]) -> Vec<String> {
    statements.iter().map(|s| s.text.clone()).collect()
}

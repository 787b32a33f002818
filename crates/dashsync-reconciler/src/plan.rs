//! Plans and the planner
//!
//! [`plan`] is a pure function: it has no side effects and no error path.
//! Items whose slug cannot be derived are simply left out, on the
//! assumption that someone fixes the offending document out of band.

use dashsync_grafana::{DashboardDocument, RemoteDashboardRef, Slug};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Kind of change an [`Action`] makes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

/// One change to the remote store, keyed by slug
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Declared but not in the store
    Create {
        slug: Slug,
        dashboard: DashboardDocument,
    },
    /// Declared and in the store; the declared document replaces the stored one
    Update {
        slug: Slug,
        dashboard: DashboardDocument,
    },
    /// In the store but no longer declared
    Delete { slug: Slug },
}

impl Action {
    pub fn slug(&self) -> &Slug {
        match self {
            Self::Create { slug, .. } | Self::Update { slug, .. } | Self::Delete { slug } => slug,
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Create { .. } => ActionKind::Create,
            Self::Update { .. } => ActionKind::Update,
            Self::Delete { .. } => ActionKind::Delete,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.slug())
    }
}

/// Number of planned actions per kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanCounts {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
}

impl PlanCounts {
    pub fn total(&self) -> usize {
        self.create + self.update + self.delete
    }
}

/// Actions for one reconciliation cycle, ordered by slug
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    actions: Vec<Action>,
}

impl Plan {
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn into_actions(self) -> Vec<Action> {
        self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn counts(&self) -> PlanCounts {
        let mut counts = PlanCounts::default();
        for action in &self.actions {
            match action.kind() {
                ActionKind::Create => counts.create += 1,
                ActionKind::Update => counts.update += 1,
                ActionKind::Delete => counts.delete += 1,
            }
        }
        counts
    }
}

impl IntoIterator for Plan {
    type Item = Action;
    type IntoIter = std::vec::IntoIter<Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.into_iter()
    }
}

/// Compute the actions that move the store from `actual` to `desired`.
///
/// Every valid slug in `actual` starts out as a delete; every valid slug in
/// `desired` then overwrites its entry with an update (slug already there)
/// or a create. Later desired documents win over earlier ones sharing a
/// slug, so there is exactly one action per slug.
pub fn plan(actual: &[RemoteDashboardRef], desired: Vec<DashboardDocument>) -> Plan {
    let mut changes: BTreeMap<Slug, Action> = BTreeMap::new();

    for remote in actual {
        if let Ok(slug) = remote.slug() {
            changes.insert(slug.clone(), Action::Delete { slug });
        }
    }

    for dashboard in desired {
        let Ok(slug) = dashboard.slug() else {
            continue;
        };
        let exists = matches!(
            changes.get(&slug),
            Some(Action::Delete { .. } | Action::Update { .. })
        );
        let action = if exists {
            Action::Update {
                slug: slug.clone(),
                dashboard,
            }
        } else {
            Action::Create {
                slug: slug.clone(),
                dashboard,
            }
        };
        changes.insert(slug, action);
    }

    Plan {
        actions: changes.into_values().collect(),
    }
}

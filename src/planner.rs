use crate::classifier::ClassificationResult;
use serde::Serialize;

/// Outcome of the protection safety check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlanDecision {
    /// Nothing is protected and stale; no calls are made
    NoOp,
    /// Stale protected instances exist but none is at the latest version and `force` was not given
    Blocked,
    Proceed,
}

/// What the executor and deregistration stages act on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionPlan {
    pub decision: PlanDecision,
    pub latest_version: i64,
    pub to_unprotect: Vec<String>,
    /// Proceeding only because `force` overrode the no-latest-instance block
    pub forced: bool,
}

impl ActionPlan {
    /// IDs the executor has to touch; empty unless the decision is `Proceed`
    pub fn executable(&self) -> &[String] {
        match self.decision {
            PlanDecision::Proceed => &self.to_unprotect,
            PlanDecision::NoOp | PlanDecision::Blocked => &[],
        }
    }
}

/// Decide whether protection removal may go ahead.
pub fn plan_protection(classification: &ClassificationResult, force: bool) -> ActionPlan {
    let (decision, forced) = if classification.to_unprotect.is_empty() {
        (PlanDecision::NoOp, false)
    } else if classification.latest_ids.is_empty() {
        if force {
            (PlanDecision::Proceed, true)
        } else {
            (PlanDecision::Blocked, false)
        }
    } else {
        (PlanDecision::Proceed, false)
    };

    ActionPlan {
        decision,
        latest_version: classification.latest_version,
        to_unprotect: classification.to_unprotect.clone(),
        forced,
    }
}

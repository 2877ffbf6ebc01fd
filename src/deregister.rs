use crate::advisory::{Advisory, AdvisorySink};
use crate::aws::TargetGroupApi;
use crate::classifier::ClassificationResult;
use crate::error::Result;
use crate::model::{RegisteredTarget, TargetGroupHealth};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

/// Targets removed (or that would be removed) from one target group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupDeregistration {
    pub target_group_arn: String,
    pub instance_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeregistrationSummary {
    /// False when the preconditions were not met and no target group was looked at
    pub ran: bool,
    pub dry_run: bool,
    pub groups: Vec<GroupDeregistration>,
}

/// Registered targets of `health` that are stale and already unprotected, in registration order
pub fn stale_targets(health: &TargetGroupHealth, stale_unprotected: &HashSet<&str>) -> Vec<RegisteredTarget> {
    health
        .targets
        .iter()
        .filter(|t| stale_unprotected.contains(t.id.as_str()))
        .cloned()
        .collect()
}

/// Pulls already-unprotected stale instances out of the group's target groups
#[derive(Debug, Clone, Copy)]
pub struct TargetGroupDeregistration {
    enabled: bool,
    dry_run: bool,
}

impl TargetGroupDeregistration {
    pub fn new(enabled: bool, dry_run: bool) -> Self {
        Self { enabled, dry_run }
    }

    /// Whether any target group should be touched at all
    pub fn should_run(&self, classification: &ClassificationResult) -> bool {
        self.enabled
            && !classification.latest_ids.is_empty()
            && !classification.stale_unprotected.is_empty()
    }

    /// Process each target group in order; the first failed call aborts the remaining groups.
    pub async fn run(
        &self,
        target_group_arns: &[String],
        classification: &ClassificationResult,
        api: &dyn TargetGroupApi,
        sink: &dyn AdvisorySink,
    ) -> Result<DeregistrationSummary> {
        let mut summary = DeregistrationSummary {
            dry_run: self.dry_run,
            ..Default::default()
        };

        if !self.should_run(classification) {
            if self.enabled {
                debug!(
                    "skipping target group deregistration: {} latest, {} stale unprotected instances",
                    classification.latest_ids.len(),
                    classification.stale_unprotected.len()
                );
            }
            return Ok(summary);
        }
        summary.ran = true;

        let stale: HashSet<&str> = classification
            .stale_unprotected
            .iter()
            .map(String::as_str)
            .collect();

        for arn in target_group_arns {
            let health = api.describe_target_health(arn).await?;
            let targets = stale_targets(&health, &stale);

            if self.dry_run {
                for target in &targets {
                    sink.emit(
                        Advisory::dry_run(format!(
                            "would remove instance {} from target group {}",
                            target, arn
                        ))
                        .with_instance(&target.id)
                        .with_target_group(arn),
                    );
                }
            } else if !targets.is_empty() {
                api.deregister_targets(arn, &targets).await?;
                info!("Removed {} instances from {}", targets.len(), arn);
                sink.emit(
                    Advisory::info(format!("Removed {} instances from {}", targets.len(), arn))
                        .with_target_group(arn),
                );
            } else {
                debug!("no stale instances registered in {}", arn);
            }

            summary.groups.push(GroupDeregistration {
                target_group_arn: arn.clone(),
                instance_ids: targets.into_iter().map(|t| t.id).collect(),
            });
        }

        Ok(summary)
    }
}

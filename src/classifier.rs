use crate::advisory::{Advisory, AdvisorySink};
use crate::error::{InputError, Result};
use crate::model::{AutoScalingGroupSnapshot, InstanceSnapshot, LaunchTemplateRef};
use serde::Serialize;
use tracing::debug;

/// How an instance relates to the group's current launch template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Classification {
    Latest,
    /// Instance runs a different launch template than the group
    TemplateMismatch,
    OutdatedVersion,
}

/// Resolve an instance's launch template reference, parsing its version string.
pub fn instance_template_ref(instance: &InstanceSnapshot) -> Result<LaunchTemplateRef> {
    let template = instance
        .launch_template
        .as_ref()
        .ok_or_else(|| InputError::MissingTemplateInfo {
            instance_id: instance.instance_id.clone(),
        })?;
    let raw = template
        .version
        .as_deref()
        .ok_or_else(|| InputError::MissingTemplateInfo {
            instance_id: instance.instance_id.clone(),
        })?;
    let version = raw
        .parse::<i64>()
        .ok()
        .filter(|v| *v >= 0)
        .ok_or_else(|| InputError::InvalidTemplateVersion {
            instance_id: instance.instance_id.clone(),
            version: raw.to_string(),
        })?;

    Ok(LaunchTemplateRef {
        name: template.name.clone(),
        version,
    })
}

/// Compare one instance against the group's active template and its latest version
pub fn compare_version(
    instance: &InstanceSnapshot,
    active_template: &str,
    latest_version: i64,
) -> Result<Classification> {
    let template = instance_template_ref(instance)?;
    Ok(compare_template(&template, active_template, latest_version))
}

fn compare_template(template: &LaunchTemplateRef, active_template: &str, latest_version: i64) -> Classification {
    if template.name != active_template {
        Classification::TemplateMismatch
    } else if template.version != latest_version {
        Classification::OutdatedVersion
    } else {
        Classification::Latest
    }
}

/// Partition of a group's instances, in snapshot order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub latest_version: i64,
    /// Instances at the latest version of the active template
    pub latest_ids: Vec<String>,
    /// Instances at an older version of the active template (reporting only)
    pub outdated_ids: Vec<String>,
    /// Instances running a different launch template
    pub mismatched_ids: Vec<String>,
    /// Stale instances still protected from scale-in
    pub to_unprotect: Vec<String>,
    /// Stale instances that are already unprotected
    pub stale_unprotected: Vec<String>,
}

impl ClassificationResult {
    pub fn total(&self) -> usize {
        self.latest_ids.len() + self.to_unprotect.len() + self.stale_unprotected.len()
    }
}

/// Classify every instance of the group against `latest_version`.
///
/// The first instance with missing or malformed template information aborts the whole pass.
pub fn classify(
    asg: &AutoScalingGroupSnapshot,
    active_template: &str,
    latest_version: i64,
    sink: &dyn AdvisorySink,
) -> Result<ClassificationResult> {
    let mut result = ClassificationResult {
        latest_version,
        ..Default::default()
    };

    for instance in &asg.instances {
        let template = instance_template_ref(instance)?;
        let id = instance.instance_id.clone();

        match compare_template(&template, active_template, latest_version) {
            Classification::Latest => {
                result.latest_ids.push(id);
                continue;
            }
            Classification::OutdatedVersion => {
                sink.emit(
                    Advisory::debug(format!("instance {} has old version {}", id, template.version))
                        .with_instance(&id),
                );
                result.outdated_ids.push(id.clone());
            }
            Classification::TemplateMismatch => {
                sink.emit(
                    Advisory::warn(format!(
                        "instance {} has different Launch Template than ASG: {}:{}",
                        id, template.name, template.version
                    ))
                    .with_instance(&id),
                );
                result.mismatched_ids.push(id.clone());
            }
        }

        if instance.protected_from_scale_in {
            result.to_unprotect.push(id);
        } else {
            sink.emit(
                Advisory::debug(format!(
                    "instance {} is already not protected from scale-in, skipping",
                    id
                ))
                .with_instance(&id),
            );
            result.stale_unprotected.push(id);
        }
    }

    debug!(
        "classified {} instances of {}: {} latest, {} to unprotect, {} already unprotected",
        result.total(),
        asg.name,
        result.latest_ids.len(),
        result.to_unprotect.len(),
        result.stale_unprotected.len()
    );

    Ok(result)
}

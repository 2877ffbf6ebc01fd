//! In-memory AWS fakes shared by the unit tests.

use crate::aws::{AutoScalingApi, LaunchTemplateApi, TargetGroupApi};
use crate::error::{AwsError, InputError, Result};
use crate::model::{AutoScalingGroupSnapshot, RegisteredTarget, TargetGroupHealth};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeAws {
    group: Option<AutoScalingGroupSnapshot>,
    latest_versions: HashMap<String, Option<i64>>,
    target_groups: HashMap<String, Vec<RegisteredTarget>>,
    fail_protection_on: Option<usize>,
    fail_deregister_for: Option<String>,
    protection_attempts: Mutex<usize>,
    protection_calls: Mutex<Vec<(String, Vec<String>)>>,
    health_lookups: Mutex<Vec<String>>,
    deregister_calls: Mutex<Vec<(String, Vec<RegisteredTarget>)>>,
}

impl FakeAws {
    pub fn with_group(mut self, group: AutoScalingGroupSnapshot) -> Self {
        self.group = Some(group);
        self
    }

    pub fn with_latest_version(mut self, template: &str, version: Option<i64>) -> Self {
        self.latest_versions.insert(template.to_string(), version);
        self
    }

    pub fn with_targets(mut self, arn: &str, ids: &[&str]) -> Self {
        let targets = ids
            .iter()
            .map(|id| RegisteredTarget::new(id, Some(80)))
            .collect();
        self.target_groups.insert(arn.to_string(), targets);
        self
    }

    /// Fail the n-th (1-based) SetInstanceProtection attempt
    pub fn fail_protection_on_call(mut self, n: usize) -> Self {
        self.fail_protection_on = Some(n);
        self
    }

    pub fn fail_deregister_for(mut self, arn: &str) -> Self {
        self.fail_deregister_for = Some(arn.to_string());
        self
    }

    pub fn protection_calls(&self) -> Vec<(String, Vec<String>)> {
        self.protection_calls.lock().unwrap().clone()
    }

    pub fn protection_attempts(&self) -> usize {
        *self.protection_attempts.lock().unwrap()
    }

    pub fn health_lookups(&self) -> Vec<String> {
        self.health_lookups.lock().unwrap().clone()
    }

    pub fn deregister_calls(&self) -> Vec<(String, Vec<RegisteredTarget>)> {
        self.deregister_calls.lock().unwrap().clone()
    }

    pub fn mutating_calls(&self) -> usize {
        self.protection_calls().len() + self.deregister_calls().len()
    }
}

#[async_trait]
impl AutoScalingApi for FakeAws {
    async fn describe_auto_scaling_group(&self, name: &str) -> Result<Option<AutoScalingGroupSnapshot>> {
        Ok(self.group.clone().filter(|g| g.name == name))
    }

    async fn set_instance_protection(
        &self,
        asg_name: &str,
        instance_ids: &[String],
        protected_from_scale_in: bool,
    ) -> Result<()> {
        assert!(!protected_from_scale_in);
        let attempt = {
            let mut attempts = self.protection_attempts.lock().unwrap();
            *attempts += 1;
            *attempts
        };
        if self.fail_protection_on == Some(attempt) {
            return Err(AwsError::service("SetInstanceProtection", asg_name, "injected failure").into());
        }
        self.protection_calls
            .lock()
            .unwrap()
            .push((asg_name.to_string(), instance_ids.to_vec()));
        Ok(())
    }
}

#[async_trait]
impl LaunchTemplateApi for FakeAws {
    async fn latest_version(&self, template_name: &str) -> Result<i64> {
        match self.latest_versions.get(template_name) {
            Some(Some(version)) => Ok(*version),
            Some(None) => Err(InputError::NoLatestVersion {
                name: template_name.to_string(),
            }
            .into()),
            None => Err(InputError::LaunchTemplateNotFound {
                name: template_name.to_string(),
            }
            .into()),
        }
    }
}

#[async_trait]
impl TargetGroupApi for FakeAws {
    async fn describe_target_health(&self, target_group_arn: &str) -> Result<TargetGroupHealth> {
        self.health_lookups
            .lock()
            .unwrap()
            .push(target_group_arn.to_string());
        let targets = self
            .target_groups
            .get(target_group_arn)
            .cloned()
            .ok_or_else(|| AwsError::service("DescribeTargetHealth", target_group_arn, "target group not found"))?;
        Ok(TargetGroupHealth {
            target_group_arn: target_group_arn.to_string(),
            targets,
        })
    }

    async fn deregister_targets(
        &self,
        target_group_arn: &str,
        targets: &[RegisteredTarget],
    ) -> Result<()> {
        if self.fail_deregister_for.as_deref() == Some(target_group_arn) {
            return Err(AwsError::service("DeregisterTargets", target_group_arn, "injected failure").into());
        }
        self.deregister_calls
            .lock()
            .unwrap()
            .push((target_group_arn.to_string(), targets.to_vec()));
        Ok(())
    }
}

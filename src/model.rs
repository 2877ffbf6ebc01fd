use serde::{Deserialize, Serialize};

/// Launch template name and resolved numeric version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchTemplateRef {
    pub name: String,
    pub version: i64,
}

/// Launch template reference as reported for a single instance.
///
/// The provider reports the version as a string; it is parsed during classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceLaunchTemplate {
    pub name: String,
    pub version: Option<String>,
}

/// One ASG member as returned by describe-auto-scaling-groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSnapshot {
    pub instance_id: String,
    pub launch_template: Option<InstanceLaunchTemplate>,
    pub protected_from_scale_in: bool,
}

impl InstanceSnapshot {
    pub fn new(instance_id: &str, template: &str, version: &str, protected: bool) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            launch_template: Some(InstanceLaunchTemplate {
                name: template.to_string(),
                version: Some(version.to_string()),
            }),
            protected_from_scale_in: protected,
        }
    }
}

/// Read-only view of an Auto Scaling Group, built once per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoScalingGroupSnapshot {
    pub name: String,
    /// `None` when the group uses neither a launch template nor a mixed instances policy template
    pub launch_template_name: Option<String>,
    pub instances: Vec<InstanceSnapshot>,
    pub target_group_arns: Vec<String>,
}

/// A target currently registered in a target group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredTarget {
    pub id: String,
    pub port: Option<i32>,
    pub state: Option<String>,
}

impl RegisteredTarget {
    pub fn new(id: &str, port: Option<i32>) -> Self {
        Self {
            id: id.to_string(),
            port,
            state: None,
        }
    }
}

impl std::fmt::Display for RegisteredTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.id, port),
            None => write!(f, "{}", self.id),
        }
    }
}

/// Registered targets of one target group at the time of the lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroupHealth {
    pub target_group_arn: String,
    pub targets: Vec<RegisteredTarget>,
}

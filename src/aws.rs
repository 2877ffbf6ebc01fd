use crate::error::{AwsError, InputError, Result};
use crate::model::{
    AutoScalingGroupSnapshot, InstanceLaunchTemplate, InstanceSnapshot, RegisteredTarget,
    TargetGroupHealth,
};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_autoscaling::error::DisplayErrorContext;
use aws_sdk_autoscaling::Client as AutoScalingClient;
use aws_sdk_ec2::Client as Ec2Client;
use aws_sdk_elasticloadbalancingv2::Client as ElbClient;
use aws_sdk_elasticloadbalancingv2::types::TargetDescription;
use tracing::{debug, info};

/// Auto Scaling operations needed by the updater
#[async_trait]
pub trait AutoScalingApi: Send + Sync {
    /// Describe a single group; `None` when it does not exist
    async fn describe_auto_scaling_group(&self, name: &str) -> Result<Option<AutoScalingGroupSnapshot>>;

    /// Set the scale-in protection flag for at most 50 instances of a group
    async fn set_instance_protection(
        &self,
        asg_name: &str,
        instance_ids: &[String],
        protected_from_scale_in: bool,
    ) -> Result<()>;
}

/// Launch template lookups
#[async_trait]
pub trait LaunchTemplateApi: Send + Sync {
    /// Latest version number of the named launch template
    async fn latest_version(&self, template_name: &str) -> Result<i64>;
}

/// Load balancer target group operations
#[async_trait]
pub trait TargetGroupApi: Send + Sync {
    async fn describe_target_health(&self, target_group_arn: &str) -> Result<TargetGroupHealth>;

    async fn deregister_targets(
        &self,
        target_group_arn: &str,
        targets: &[RegisteredTarget],
    ) -> Result<()>;
}

/// AWS clients for Auto Scaling, EC2 and ELBv2
#[derive(Debug, Clone)]
pub struct AwsManager {
    pub autoscaling_client: AutoScalingClient,
    pub ec2_client: Ec2Client,
    pub elb_client: ElbClient,
    region: String,
}

impl AwsManager {
    /// Build clients from the default credential chain, optionally pinned to a region/profile
    pub async fn new(region: Option<String>, profile: Option<String>) -> Self {
        info!("Initializing AWS manager with region: {:?}, profile: {:?}", region, profile);

        let mut config_loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(ref region_name) = region {
            config_loader = config_loader.region(Region::new(region_name.clone()));
        }

        if let Some(ref profile_name) = profile {
            config_loader = config_loader.profile_name(profile_name);
        }

        let config = config_loader.load().await;

        let autoscaling_client = AutoScalingClient::new(&config);
        let ec2_client = Ec2Client::new(&config);
        let elb_client = ElbClient::new(&config);

        let region_name = config
            .region()
            .map(|r| r.as_ref().to_string())
            .unwrap_or_else(|| "us-east-1".to_string());

        debug!("AWS clients initialized successfully");

        Self {
            autoscaling_client,
            ec2_client,
            elb_client,
            region: region_name,
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

fn group_from_sdk(
    group: &aws_sdk_autoscaling::types::AutoScalingGroup,
) -> Result<AutoScalingGroupSnapshot> {
    let name = group
        .auto_scaling_group_name()
        .ok_or_else(|| InputError::MalformedResponse {
            resource: "auto scaling group".to_string(),
            reason: "group name missing".to_string(),
        })?
        .to_string();

    // Mixed instances policies carry the template one level deeper
    let launch_template_name = group
        .launch_template()
        .and_then(|lt| lt.launch_template_name())
        .or_else(|| {
            group
                .mixed_instances_policy()
                .and_then(|policy| policy.launch_template())
                .and_then(|lt| lt.launch_template_specification())
                .and_then(|spec| spec.launch_template_name())
        })
        .map(str::to_string);

    let mut instances = Vec::with_capacity(group.instances().len());
    for instance in group.instances() {
        let instance_id = instance
            .instance_id()
            .ok_or_else(|| InputError::MalformedResponse {
                resource: format!("instance of {}", name),
                reason: "instance id missing".to_string(),
            })?
            .to_string();

        let launch_template = instance.launch_template().and_then(|lt| {
            lt.launch_template_name().map(|template_name| InstanceLaunchTemplate {
                name: template_name.to_string(),
                version: lt.version().map(str::to_string),
            })
        });

        instances.push(InstanceSnapshot {
            instance_id,
            launch_template,
            protected_from_scale_in: instance.protected_from_scale_in().unwrap_or(false),
        });
    }

    Ok(AutoScalingGroupSnapshot {
        name,
        launch_template_name,
        instances,
        target_group_arns: group.target_group_arns().to_vec(),
    })
}

#[async_trait]
impl AutoScalingApi for AwsManager {
    async fn describe_auto_scaling_group(&self, name: &str) -> Result<Option<AutoScalingGroupSnapshot>> {
        debug!("describing ASG {}...", name);

        let response = self
            .autoscaling_client
            .describe_auto_scaling_groups()
            .auto_scaling_group_names(name)
            .send()
            .await
            .map_err(|e| AwsError::service("DescribeAutoScalingGroups", name, DisplayErrorContext(&e)))?;

        match response.auto_scaling_groups() {
            [group] => group_from_sdk(group).map(Some),
            [] => Ok(None),
            groups => Err(InputError::MalformedResponse {
                resource: format!("auto scaling group {}", name),
                reason: format!("expected one group, got {}", groups.len()),
            }
            .into()),
        }
    }

    async fn set_instance_protection(
        &self,
        asg_name: &str,
        instance_ids: &[String],
        protected_from_scale_in: bool,
    ) -> Result<()> {
        debug!("calling SetInstanceProtection with {} instances", instance_ids.len());

        self.autoscaling_client
            .set_instance_protection()
            .auto_scaling_group_name(asg_name)
            .set_instance_ids(Some(instance_ids.to_vec()))
            .protected_from_scale_in(protected_from_scale_in)
            .send()
            .await
            .map_err(|e| AwsError::service("SetInstanceProtection", asg_name, DisplayErrorContext(&e)))?;

        Ok(())
    }
}

#[async_trait]
impl LaunchTemplateApi for AwsManager {
    async fn latest_version(&self, template_name: &str) -> Result<i64> {
        debug!("describing Launch Template {}...", template_name);

        let response = self
            .ec2_client
            .describe_launch_templates()
            .launch_template_names(template_name)
            .send()
            .await
            .map_err(|e| AwsError::service("DescribeLaunchTemplates", template_name, DisplayErrorContext(&e)))?;

        let template = match response.launch_templates() {
            [template] => template,
            _ => {
                return Err(InputError::LaunchTemplateNotFound {
                    name: template_name.to_string(),
                }
                .into())
            }
        };

        template.latest_version_number().ok_or_else(|| {
            InputError::NoLatestVersion {
                name: template_name.to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl TargetGroupApi for AwsManager {
    async fn describe_target_health(&self, target_group_arn: &str) -> Result<TargetGroupHealth> {
        debug!("describing target health for {}", target_group_arn);

        let response = self
            .elb_client
            .describe_target_health()
            .target_group_arn(target_group_arn)
            .send()
            .await
            .map_err(|e| AwsError::service("DescribeTargetHealth", target_group_arn, DisplayErrorContext(&e)))?;

        let targets = response
            .target_health_descriptions()
            .iter()
            .filter_map(|description| {
                let target = description.target()?;
                Some(RegisteredTarget {
                    id: target.id()?.to_string(),
                    port: target.port(),
                    state: description
                        .target_health()
                        .and_then(|h| h.state())
                        .map(|s| s.as_str().to_string()),
                })
            })
            .collect();

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
        let descriptions = targets
            .iter()
            .map(|t| TargetDescription::builder().id(&t.id).set_port(t.port).build())
            .collect::<Vec<_>>();

        self.elb_client
            .deregister_targets()
            .target_group_arn(target_group_arn)
            .set_targets(Some(descriptions))
            .send()
            .await
            .map_err(|e| AwsError::service("DeregisterTargets", target_group_arn, DisplayErrorContext(&e)))?;

        Ok(())
    }
}

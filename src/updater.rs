use crate::advisory::{Advisory, AdvisorySink};
use crate::aws::{AutoScalingApi, LaunchTemplateApi, TargetGroupApi};
use crate::classifier::{classify, ClassificationResult};
use crate::deregister::{DeregistrationSummary, TargetGroupDeregistration};
use crate::error::{InputError, Result};
use crate::executor::{BatchExecutor, ExecutionSummary, MAX_PROTECTION_BATCH_SIZE};
use crate::model::AutoScalingGroupSnapshot;
use crate::planner::{plan_protection, ActionPlan, PlanDecision};
use serde::Serialize;
use tracing::{debug, info};

/// Per-invocation options, as handed over by the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub asg: String,
    pub dry_run: bool,
    pub force: bool,
    pub deregister_from_target_groups: bool,
    pub batch_size: usize,
}

impl RunOptions {
    pub fn new(asg: &str) -> Self {
        Self {
            asg: asg.to_string(),
            dry_run: false,
            force: false,
            deregister_from_target_groups: false,
            batch_size: MAX_PROTECTION_BATCH_SIZE,
        }
    }
}

/// A described group with its instances classified, before anything is changed
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedGroup {
    pub asg: AutoScalingGroupSnapshot,
    pub launch_template: String,
    pub classification: ClassificationResult,
}

/// Everything a run decided and did
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub asg: String,
    pub launch_template: String,
    pub classification: ClassificationResult,
    pub plan: ActionPlan,
    pub deregistration: DeregistrationSummary,
    pub execution: ExecutionSummary,
}

/// Drives one pass over a single Auto Scaling Group
pub struct Updater<'a> {
    autoscaling: &'a dyn AutoScalingApi,
    templates: &'a dyn LaunchTemplateApi,
    target_groups: &'a dyn TargetGroupApi,
    sink: &'a dyn AdvisorySink,
}

impl<'a> Updater<'a> {
    pub fn new<C>(client: &'a C, sink: &'a dyn AdvisorySink) -> Self
    where
        C: AutoScalingApi + LaunchTemplateApi + TargetGroupApi,
    {
        Self {
            autoscaling: client,
            templates: client,
            target_groups: client,
            sink,
        }
    }

    /// Classify, then deregister and remove protection
    pub async fn run(&self, options: &RunOptions) -> Result<RunReport> {
        // Validate before any remote call
        BatchExecutor::new(options.batch_size, options.dry_run)?;

        let group = self.classify_group(&options.asg).await?;
        self.apply(group, options).await
    }

    /// Describe the group and its launch template and classify every instance. Read-only.
    pub async fn classify_group(&self, asg_name: &str) -> Result<ClassifiedGroup> {
        let asg = self
            .autoscaling
            .describe_auto_scaling_group(asg_name)
            .await?
            .ok_or_else(|| InputError::AsgNotFound {
                asg: asg_name.to_string(),
            })?;

        let template = asg
            .launch_template_name
            .clone()
            .ok_or_else(|| InputError::NoLaunchTemplate {
                asg: asg_name.to_string(),
            })?;

        debug!("ASG {} uses Launch Template {}, describing LT...", asg.name, template);
        let latest_version = self.templates.latest_version(&template).await?;
        info!(
            "ASG {} has latest version {}, looking for old instances...",
            asg.name, latest_version
        );

        let classification = classify(&asg, &template, latest_version, self.sink)?;

        Ok(ClassifiedGroup {
            asg,
            launch_template: template,
            classification,
        })
    }

    /// Deregister stale targets, then plan and execute protection removal
    pub async fn apply(&self, group: ClassifiedGroup, options: &RunOptions) -> Result<RunReport> {
        let executor = BatchExecutor::new(options.batch_size, options.dry_run)?;
        let ClassifiedGroup {
            asg,
            launch_template,
            classification,
        } = group;

        let deregistration = TargetGroupDeregistration::new(
            options.deregister_from_target_groups,
            options.dry_run,
        )
        .run(&asg.target_group_arns, &classification, self.target_groups, self.sink)
        .await?;

        let plan = plan_protection(&classification, options.force);
        self.report_plan(&plan);

        let execution = executor
            .execute(&asg.name, plan.executable(), self.autoscaling, self.sink)
            .await?;

        Ok(RunReport {
            asg: asg.name,
            launch_template,
            classification,
            plan,
            deregistration,
            execution,
        })
    }

    fn report_plan(&self, plan: &ActionPlan) {
        match plan.decision {
            PlanDecision::NoOp => {
                self.sink
                    .emit(Advisory::info("No old instances with scale in protection enabled found"));
            }
            PlanDecision::Blocked => {
                self.sink.emit(Advisory::warn(format!(
                    "No instances at latest Launch Template version {} found",
                    plan.latest_version
                )));
                self.sink.emit(Advisory::warn(
                    "no changes made, use `--force` flag to override this behavior",
                ));
            }
            PlanDecision::Proceed if plan.forced => {
                self.sink.emit(Advisory::warn(format!(
                    "No instances at latest Launch Template version {} found",
                    plan.latest_version
                )));
                self.sink.emit(Advisory::warn(
                    "`--force` flag provided, potentially updating all instances",
                ));
            }
            PlanDecision::Proceed => {}
        }
    }
}

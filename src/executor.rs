use crate::advisory::{Advisory, AdvisorySink};
use crate::aws::AutoScalingApi;
use crate::error::{ConfigError, Result};
use serde::Serialize;
use tracing::debug;

/// Largest instance-ID list accepted by SetInstanceProtection
pub const MAX_PROTECTION_BATCH_SIZE: usize = 50;

/// What the executor did (or would have done, in dry-run)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionSummary {
    /// Size of each batch, in submission order
    pub batches: Vec<usize>,
    pub instances: usize,
    pub dry_run: bool,
}

/// Clears scale-in protection in fixed-size batches, one batch at a time
#[derive(Debug, Clone, Copy)]
pub struct BatchExecutor {
    batch_size: usize,
    dry_run: bool,
}

impl BatchExecutor {
    pub fn new(batch_size: usize, dry_run: bool) -> Result<Self> {
        if batch_size == 0 || batch_size > MAX_PROTECTION_BATCH_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "batch_size".to_string(),
                message: format!(
                    "must be between 1 and {}, got {}",
                    MAX_PROTECTION_BATCH_SIZE, batch_size
                ),
            }
            .into());
        }
        Ok(Self { batch_size, dry_run })
    }

    /// Contiguous, non-overlapping batches covering `ids` in order
    pub fn partition<'a>(&self, ids: &'a [String]) -> Vec<&'a [String]> {
        ids.chunks(self.batch_size).collect()
    }

    /// Remove protection from `ids` on `asg_name`.
    ///
    /// Stops at the first failed call; batches already submitted stay applied.
    pub async fn execute(
        &self,
        asg_name: &str,
        ids: &[String],
        api: &dyn AutoScalingApi,
        sink: &dyn AdvisorySink,
    ) -> Result<ExecutionSummary> {
        let mut summary = ExecutionSummary {
            dry_run: self.dry_run,
            ..Default::default()
        };
        if ids.is_empty() {
            return Ok(summary);
        }

        let header = format!("Removing scale in protection for {} instances", ids.len());
        sink.emit(if self.dry_run {
            Advisory::dry_run(header)
        } else {
            Advisory::info(header)
        });

        for (index, batch) in self.partition(ids).into_iter().enumerate() {
            if self.dry_run {
                for id in batch {
                    sink.emit(
                        Advisory::dry_run(format!(
                            "would remove instance protection on instanceId {}",
                            id
                        ))
                        .with_instance(id),
                    );
                }
            } else {
                debug!("submitting protection batch {} ({} instances)", index + 1, batch.len());
                api.set_instance_protection(asg_name, batch, false).await?;

                for id in batch {
                    sink.emit(
                        Advisory::debug(format!("instance protection removed for instance: {}", id))
                            .with_instance(id),
                    );
                }
            }

            summary.batches.push(batch.len());
            summary.instances += batch.len();
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisory::{AdvisorySeverity, MemorySink};
    use crate::testing::FakeAws;
    use proptest::prelude::*;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("i-{:04}", i)).collect()
    }

    #[test]
    fn test_new_rejects_invalid_batch_size() {
        assert!(BatchExecutor::new(0, false).is_err());
        assert!(BatchExecutor::new(51, false).is_err());
        assert!(BatchExecutor::new(1, false).is_ok());
        assert!(BatchExecutor::new(50, false).is_ok());
    }

    #[tokio::test]
    async fn test_live_batches_of_fifty() {
        let aws = FakeAws::default();
        let sink = MemorySink::default();
        let executor = BatchExecutor::new(MAX_PROTECTION_BATCH_SIZE, false).unwrap();
        let all = ids(120);

        let summary = executor.execute("web-asg", &all, &aws, &sink).await.unwrap();

        assert_eq!(summary.batches, vec![50, 50, 20]);
        assert_eq!(summary.instances, 120);
        let calls = aws.protection_calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].0, "web-asg");
        // each call carries only its own chunk, in order
        assert_eq!(calls[0].1, all[0..50].to_vec());
        assert_eq!(calls[1].1, all[50..100].to_vec());
        assert_eq!(calls[2].1, all[100..120].to_vec());
        assert_eq!(sink.with_severity(AdvisorySeverity::Debug).len(), 120);
    }

    #[tokio::test]
    async fn test_dry_run_makes_no_calls() {
        let aws = FakeAws::default();
        let sink = MemorySink::default();
        let executor = BatchExecutor::new(MAX_PROTECTION_BATCH_SIZE, true).unwrap();

        let summary = executor.execute("web-asg", &ids(120), &aws, &sink).await.unwrap();

        assert_eq!(summary.batches, vec![50, 50, 20]);
        assert!(summary.dry_run);
        assert!(aws.protection_calls().is_empty());
        // header plus one record per instance
        assert_eq!(sink.with_severity(AdvisorySeverity::DryRun).len(), 121);
    }

    #[tokio::test]
    async fn test_failure_aborts_remaining_batches() {
        let aws = FakeAws::default().fail_protection_on_call(2);
        let sink = MemorySink::default();
        let executor = BatchExecutor::new(10, false).unwrap();

        let result = executor.execute("web-asg", &ids(35), &aws, &sink).await;

        assert!(result.is_err());
        // the first batch was committed, the failing one attempted, nothing after it
        assert_eq!(aws.protection_calls().len(), 1);
        assert_eq!(aws.protection_attempts(), 2);
    }

    #[tokio::test]
    async fn test_empty_input_is_silent() {
        let aws = FakeAws::default();
        let sink = MemorySink::default();
        let executor = BatchExecutor::new(50, false).unwrap();

        let summary = executor.execute("web-asg", &[], &aws, &sink).await.unwrap();
        assert!(summary.batches.is_empty());
        assert!(sink.records().is_empty());
    }

    proptest! {
        #[test]
        fn prop_partition_covers_input_in_order(n in 0usize..400, batch_size in 1usize..=50) {
            let executor = BatchExecutor::new(batch_size, false).unwrap();
            let all = ids(n);
            let batches = executor.partition(&all);

            prop_assert_eq!(batches.len(), (n + batch_size - 1) / batch_size);
            prop_assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= batch_size));
            let flattened: Vec<String> = batches.concat();
            prop_assert_eq!(flattened, all);
        }

        #[test]
        fn prop_dry_run_matches_live_batch_structure(n in 0usize..200, batch_size in 1usize..=50) {
            let all = ids(n);
            let (live, dry) = tokio_test::block_on(async {
                let aws = FakeAws::default();
                let sink = MemorySink::default();
                let live = BatchExecutor::new(batch_size, false).unwrap()
                    .execute("asg", &all, &aws, &sink).await.unwrap();
                let dry_aws = FakeAws::default();
                let dry = BatchExecutor::new(batch_size, true).unwrap()
                    .execute("asg", &all, &dry_aws, &sink).await.unwrap();
                assert!(dry_aws.protection_calls().is_empty());
                (live, dry)
            });
            prop_assert_eq!(live.batches, dry.batches);
        }
    }
}

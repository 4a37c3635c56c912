use std::collections::VecDeque;

use crate::runner::config::{RunnerConfig, SubmitOrder};
use crate::runner::instance::create_instance;
use crate::runner::jobspec::JobSpec;
use crate::runner::provider::ComputeApi;
use crate::runner::quota::poll_accelerators;

/// Counters describing the progress of a [`SubmissionLoop`].
#[derive(Debug, Default, Clone)]
pub struct SubmissionStats {
    /// Number of successful quota queries.
    pub polls: usize,
    /// How many times the loop waited for free accelerators.
    pub sleeps: usize,
    /// Names of requested instances, in submission order.
    pub submitted: Vec<String>,
}

enum LoopState {
    Polling,
    Submitting(JobSpec),
    Complete,
}

/// Submits queued notebooks one by one, each time waiting until the accelerator quota allows it.
///
/// The quota is checked before every single submission. When it is exhausted, the loop sleeps
/// for the configured poll interval and checks it again. The first error stops the loop; the
/// notebooks that were not submitted yet stay in the queue.
pub struct SubmissionLoop {
    queue: VecDeque<JobSpec>,
    config: RunnerConfig,
    api: Box<dyn ComputeApi>,
    stats: SubmissionStats,
    failed: Option<JobSpec>,
}

impl SubmissionLoop {
    pub fn new(config: RunnerConfig, api: Box<dyn ComputeApi>, jobs: Vec<JobSpec>) -> Self {
        Self {
            queue: jobs.into(),
            config,
            api,
            stats: SubmissionStats::default(),
            failed: None,
        }
    }

    pub async fn run(&mut self) -> crate::Result<()> {
        let mut state = if self.queue.is_empty() {
            LoopState::Complete
        } else {
            LoopState::Polling
        };

        loop {
            state = match state {
                LoopState::Polling => self.poll().await?,
                LoopState::Submitting(job) => self.submit(job).await?,
                LoopState::Complete => {
                    log::debug!(
                        "Submission finished, {} instance(s) requested",
                        self.stats.submitted.len()
                    );
                    return Ok(());
                }
            };
        }
    }

    async fn poll(&mut self) -> crate::Result<LoopState> {
        let quota = poll_accelerators(self.api.as_ref(), &self.config)
            .await?
            .capped(self.config.max_accelerators);
        self.stats.polls += 1;

        if quota.has_capacity() {
            log::debug!(
                "Accelerators available ({}/{} used)",
                quota.usage,
                quota.limit
            );
            return Ok(match self.pop_next() {
                Some(job) => LoopState::Submitting(job),
                None => LoopState::Complete,
            });
        }

        log::info!(
            "No free accelerators ({}/{} used), {} notebook(s) waiting, checking again in {}",
            quota.usage,
            quota.limit,
            self.queue.len(),
            humantime::format_duration(self.config.poll_interval)
        );
        self.stats.sleeps += 1;
        tokio::time::sleep(self.config.poll_interval).await;
        Ok(LoopState::Polling)
    }

    async fn submit(&mut self, job: JobSpec) -> crate::Result<LoopState> {
        match create_instance(self.api.as_ref(), &self.config, &job).await {
            Ok(instance) => {
                log::info!(
                    "Instance {} requested for notebook {job} (operation {})",
                    instance.name,
                    instance.operation.name
                );
                self.stats.submitted.push(instance.name);
                Ok(if self.queue.is_empty() {
                    LoopState::Complete
                } else {
                    LoopState::Polling
                })
            }
            Err(error) => {
                log::error!("Submission of notebook {job} failed");
                self.failed = Some(job);
                Err(error)
            }
        }
    }

    fn pop_next(&mut self) -> Option<JobSpec> {
        match self.config.submit_order {
            SubmitOrder::Fifo => self.queue.pop_front(),
            SubmitOrder::Lifo => self.queue.pop_back(),
        }
    }

    /// Notebooks that were not submitted yet, in the order in which they would be submitted.
    pub fn remaining(&self) -> Vec<&JobSpec> {
        match self.config.submit_order {
            SubmitOrder::Fifo => self.queue.iter().collect(),
            SubmitOrder::Lifo => self.queue.iter().rev().collect(),
        }
    }

    /// Notebook whose submission has failed. It is not part of [`Self::remaining`].
    pub fn failed(&self) -> Option<&JobSpec> {
        self.failed.as_ref()
    }

    pub fn stats(&self) -> &SubmissionStats {
        &self.stats
    }
}

// src/exporter.rs
//
// Supervisor: owns every job, runs each on its own task, and waits for all of them
// once the cancellation token fires.

use crate::jobs::{ContractBalanceJob, CHAINLINK_DATA_FEED};
use crate::gauge_sink::MetricsError;
use crate::periodic_task::{Job, PeriodicTask};
use crate::rpc_client::ContractCaller;
use crate::settings::Settings;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub struct Exporter {
    task: PeriodicTask,
    jobs: Vec<Arc<dyn Job>>,
}

impl Exporter {
    pub fn new(task: PeriodicTask) -> Self {
        Self {
            task,
            jobs: Vec::new(),
        }
    }

    /// Builds every job configured in `settings` over a shared caller.
    /// Job types without targets are skipped.
    pub fn from_settings(
        settings: &Settings,
        caller: Arc<dyn ContractCaller>,
    ) -> Result<Self, MetricsError> {
        let mut exporter = Self::new(PeriodicTask::new(settings.poll_interval()));

        let feeds = &settings.jobs.chainlink_data_feed;
        if feeds.is_empty() {
            warn!(job = CHAINLINK_DATA_FEED.name, "No targets configured, job disabled");
        } else {
            let job = ContractBalanceJob::new(
                CHAINLINK_DATA_FEED,
                caller,
                &settings.metrics.namespace,
                settings.const_labels(),
                feeds.clone(),
                settings.poll_options(),
            )?;
            exporter.add_job(Arc::new(job));
        }

        Ok(exporter)
    }

    pub fn add_job(&mut self, job: Arc<dyn Job>) {
        self.jobs.push(job);
    }

    pub fn job_names(&self) -> Vec<&'static str> {
        self.jobs.iter().map(|j| j.name()).collect()
    }

    /// Runs until `cancel` fires and every job has returned.
    pub async fn run(self, cancel: CancellationToken) {
        if self.jobs.is_empty() {
            warn!("No jobs to run, waiting for shutdown");
            cancel.cancelled().await;
            return;
        }

        info!(jobs = self.jobs.len(), interval = ?self.task.interval(), "Starting exporter");
        let mut set = JoinSet::new();
        for job in self.jobs {
            info!(job = job.name(), "Spawning job");
            set.spawn(self.task.run(cancel.child_token(), job));
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(ticks) => info!(ticks, "Job finished"),
                Err(e) => error!(error = %e, "Job task failed"),
            }
        }
    }
}

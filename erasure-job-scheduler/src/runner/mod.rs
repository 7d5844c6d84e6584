use erasure_common::db::job_registry::Dao as JobRegistryDao;

use futures::future;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime};
use tokio::time;

use crate::jobs::Job;

struct JobContainer {
    job: Box<dyn Job>,
    run_frequency: Duration,
    last_run_time: SystemTime,
}

pub struct JobRunner {
    jobs: Vec<JobContainer>,
    update_frequency: Duration,
    registry_path: PathBuf,
}

impl JobRunner {
    pub fn new(update_frequency: Duration, registry_path: PathBuf) -> Self {
        Self {
            jobs: Vec::new(),
            update_frequency,
            registry_path,
        }
    }

    /// A job that has never run before waits one full `run_frequency` before its first
    /// run.
    pub async fn register(&mut self, job: Box<dyn Job>, run_frequency: Duration) {
        let job_name_ref = job.name();

        log::info!(
            "Registered job \"{}\" to run every {} seconds",
            job_name_ref,
            run_frequency.as_secs()
        );

        let dao = JobRegistryDao::new(&self.registry_path);
        let last_run_time = tokio::task::spawn_blocking(move || {
            dao.get_job_last_run_timestamp(job_name_ref)
                .unwrap_or_else(|e| {
                    log::error!(
                        "Failed to get last run timestamp for job '{}': {}",
                        job_name_ref,
                        e
                    );
                    None
                })
        })
        .await
        .unwrap_or_else(|e| {
            log::error!("Failed to join Tokio task: {}", e);
            None
        });

        let job_container = JobContainer {
            job,
            run_frequency,
            last_run_time: last_run_time.unwrap_or(SystemTime::now()),
        };

        self.jobs.push(job_container);
    }

    pub async fn start(&mut self) -> ! {
        loop {
            let before = Instant::now();
            self.run_due_jobs().await;
            let delta = Instant::now() - before;

            if delta < self.update_frequency {
                time::sleep(self.update_frequency - delta).await;
            }
        }
    }

    async fn run_due_jobs(&mut self) {
        let mut job_names = Vec::with_capacity(self.jobs.len());
        let mut job_futures = Vec::with_capacity(self.jobs.len());
        let mut job_runs = Vec::with_capacity(self.jobs.len());

        for job_container in &mut self.jobs {
            let now = SystemTime::now();

            let time_elapsed_since_last_run = now
                .duration_since(job_container.last_run_time)
                .unwrap_or(Duration::from_nanos(0));
            let is_time_to_run = time_elapsed_since_last_run >= job_container.run_frequency;

            if !is_time_to_run || !job_container.job.is_ready() {
                continue;
            }

            job_container.last_run_time = now;

            let name_ref = job_container.job.name();
            log::info!("Executing job \"{}\"", name_ref);
            job_names.push(name_ref);
            job_runs.push((name_ref, now));
            job_futures.push(job_container.job.execute());
        }

        if job_futures.is_empty() {
            return;
        }

        // Recorded sequentially since each write replaces the whole registry file
        let dao = JobRegistryDao::new(&self.registry_path);
        let record_job_runs = tokio::task::spawn_blocking(move || {
            for (name, run_time) in job_runs {
                if let Err(e) = dao.set_job_last_run_timestamp(name, run_time) {
                    log::error!("Error recording run of job \"{}\": {}", name, e);
                }
            }
        });

        let (job_results, recording_result) =
            future::join(future::join_all(job_futures), record_job_runs).await;

        for (i, result) in job_results.into_iter().enumerate() {
            if let Err(e) = result {
                log::error!("Job \"{}\" failed: {}", job_names[i], e);
            } else {
                log::info!("Job \"{}\" finished successfully", job_names[i]);
            }
        }

        if let Err(e) = recording_result {
            log::error!("Failed to join Tokio task: {}", e);
        }
    }
}

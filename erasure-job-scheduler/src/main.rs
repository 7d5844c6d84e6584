use erasure_common::db::StoreHandle;

use flexi_logger::{Age, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming, WriteMode};
use runner::JobRunner;

mod env;
mod jobs;
mod runner;

use jobs::ClearExpiredDeletionRequestsJob;

fn main() {
    let requests_dir = env::CONF.requests_dir();

    let store = match StoreHandle::open_file_store(&requests_dir) {
        Ok(s) => s,
        Err(e) => {
            eprintln!(
                "ERROR: Failed to open request store at {}: {e}",
                requests_dir.display()
            );
            std::process::exit(1);
        }
    };

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(env::CONF.worker_threads)
        .max_blocking_threads(env::CONF.max_blocking_threads)
        .enable_all()
        .build()
        .expect("Failed to launch asynchronous runtime")
        .block_on(async move {
            let _logger = Logger::try_with_str(&env::CONF.log_level)
                .expect(
                    "Invalid log level. Options: ERROR, WARN, INFO, DEBUG, TRACE. \
                     Example: `info, my::critical::module=trace`",
                )
                .log_to_file(FileSpec::default().directory("./logs"))
                .rotate(
                    Criterion::Age(Age::Day),
                    Naming::Timestamps,
                    Cleanup::KeepLogAndCompressedFiles(60, 365),
                )
                .cleanup_in_background_thread(true)
                .duplicate_to_stdout(Duplicate::All)
                .write_mode(WriteMode::BufferAndFlush)
                .format(|writer, now, record| {
                    write!(
                        writer,
                        "{:5} | {} | {}:{} | {}",
                        record.level(),
                        now.format("%Y-%m-%dT%H:%M:%S%.6fZ"),
                        record.module_path().unwrap_or("<unknown>"),
                        record.line().unwrap_or(0),
                        record.args()
                    )
                })
                .use_utc()
                .start()
                .expect("Failed to start logger");

            log::info!("Using request store at {}", requests_dir.display());

            let mut job_runner =
                JobRunner::new(env::CONF.update_frequency, env::CONF.job_registry_path());

            job_runner
                .register(
                    Box::new(ClearExpiredDeletionRequestsJob::new(
                        store.clone(),
                        env::CONF.request_expiry,
                    )),
                    env::CONF.clear_expired_requests_job_frequency,
                )
                .await;

            job_runner.start().await;
        });
}

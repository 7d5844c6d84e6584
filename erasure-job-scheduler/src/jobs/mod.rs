mod clear_expired_deletion_requests;

pub use clear_expired_deletion_requests::ClearExpiredDeletionRequestsJob;

use erasure_common::db::DaoError;

use async_trait::async_trait;
use std::fmt;
use tokio::task::JoinError;

#[derive(Debug)]
pub enum JobError {
    DaoFailure(Option<DaoError>),
    ConcurrencyError(JoinError),
}

impl std::error::Error for JobError {}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::DaoFailure(e) => {
                if let Some(inner_err) = e {
                    write!(f, "JobError: {inner_err}")
                } else {
                    write!(f, "JobError: DaoFailure")
                }
            }
            JobError::ConcurrencyError(e) => {
                write!(f, "JobError: ConcurrencyError: {e}")
            }
        }
    }
}

impl From<DaoError> for JobError {
    fn from(e: DaoError) -> Self {
        JobError::DaoFailure(Some(e))
    }
}

impl From<JoinError> for JobError {
    fn from(e: JoinError) -> Self {
        JobError::ConcurrencyError(e)
    }
}

#[async_trait]
pub trait Job: Send {
    fn name(&self) -> &'static str;
    fn is_ready(&self) -> bool;
    async fn execute(&mut self) -> Result<(), JobError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    pub struct MockJob {
        pub name: &'static str,
        pub fails: bool,
        pub runs: Arc<Mutex<usize>>,
    }

    impl MockJob {
        pub fn new(name: &'static str) -> Self {
            Self {
                name,
                fails: false,
                runs: Arc::new(Mutex::new(0)),
            }
        }

        pub fn failing(name: &'static str) -> Self {
            Self {
                fails: true,
                ..Self::new(name)
            }
        }
    }

    #[async_trait]
    impl Job for MockJob {
        fn name(&self) -> &'static str {
            self.name
        }

        fn is_ready(&self) -> bool {
            true
        }

        async fn execute(&mut self) -> Result<(), JobError> {
            *self.runs.lock().unwrap() += 1;

            if self.fails {
                return Err(JobError::DaoFailure(None));
            }

            Ok(())
        }
    }

    #[tokio::test]
    async fn test_mock_job_execute() {
        let mut job = MockJob::new("Mock");
        let runs = Arc::clone(&job.runs);

        job.execute().await.unwrap();
        job.execute().await.unwrap();
        assert_eq!(*runs.lock().unwrap(), 2);

        let mut job = MockJob::failing("Failing Mock");
        assert!(matches!(
            job.execute().await.unwrap_err(),
            JobError::DaoFailure(None)
        ));
    }

    #[test]
    fn test_job_error_display() {
        assert_eq!(
            JobError::DaoFailure(None).to_string(),
            "JobError: DaoFailure"
        );
        assert_eq!(
            JobError::from(DaoError::DuplicateActiveRequest).to_string(),
            "JobError: DaoError: An active deletion request already exists for this email"
        );
    }
}

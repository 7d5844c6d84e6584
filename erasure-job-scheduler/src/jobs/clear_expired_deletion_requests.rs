use erasure_common::db::deletion_request::Dao as DeletionRequestDao;
use erasure_common::db::StoreHandle;

use async_trait::async_trait;
use std::time::Duration;

use crate::jobs::{Job, JobError};

pub struct ClearExpiredDeletionRequestsJob {
    store: StoreHandle,
    expiry_window: Duration,
    is_running: bool,
}

impl ClearExpiredDeletionRequestsJob {
    pub fn new(store: StoreHandle, expiry_window: Duration) -> Self {
        Self {
            store,
            expiry_window,
            is_running: false,
        }
    }
}

#[async_trait]
impl Job for ClearExpiredDeletionRequestsJob {
    fn name(&self) -> &'static str {
        "Clear Expired Deletion Requests"
    }

    fn is_ready(&self) -> bool {
        !self.is_running
    }

    async fn execute(&mut self) -> Result<(), JobError> {
        self.is_running = true;

        let dao = DeletionRequestDao::new(&self.store, self.expiry_window);
        let result = tokio::task::spawn_blocking(move || dao.delete_expired_requests()).await;

        self.is_running = false;

        let deleted_count = result??;
        if deleted_count > 0 {
            log::info!("Cleared {deleted_count} expired deletion request(s)");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use erasure_common::clock::ManualClock;
    use erasure_common::db::deletion_request::ConfirmOutcome;

    use std::sync::Arc;

    const WINDOW: Duration = Duration::from_secs(24 * 3600);

    #[tokio::test]
    async fn test_execute() {
        let clock = Arc::new(ManualClock::default());
        let store = StoreHandle::in_memory().with_clock(clock.clone());
        let dao = DeletionRequestDao::new(&store, WINDOW);

        let abandoned_token = dao
            .submit_request("abandoned@example.com", "other", "")
            .unwrap();

        let confirmed_token = dao
            .submit_request("confirmed@example.com", "privacy-concerns", "")
            .unwrap();
        assert!(matches!(
            dao.confirm_request(&confirmed_token).unwrap(),
            ConfirmOutcome::Confirmed(_)
        ));

        clock.advance(WINDOW + Duration::from_secs(1));

        let fresh_token = dao
            .submit_request("fresh@example.com", "too-expensive", "")
            .unwrap();

        assert_eq!(store.record_count().unwrap(), 3);

        let mut job = ClearExpiredDeletionRequestsJob::new(store.clone(), WINDOW);
        assert!(job.is_ready());
        job.execute().await.unwrap();
        assert!(job.is_ready());

        assert_eq!(store.record_count().unwrap(), 2);
        assert!(dao.get_request(&abandoned_token).unwrap().is_none());
        assert!(dao.get_request(&confirmed_token).unwrap().is_some());
        assert!(dao.get_request(&fresh_token).unwrap().is_some());

        // Nothing left to clear
        job.execute().await.unwrap();
        assert_eq!(store.record_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_execute_on_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::default());

        let store = StoreHandle::open_file_store(dir.path())
            .unwrap()
            .with_clock(clock.clone());
        let dao = DeletionRequestDao::new(&store, WINDOW);

        let token = dao
            .submit_request("file@example.com", "other", "")
            .unwrap();

        let mut job = ClearExpiredDeletionRequestsJob::new(store.clone(), WINDOW);

        job.execute().await.unwrap();
        assert!(dao.get_request(&token).unwrap().is_some());

        clock.advance(WINDOW + Duration::from_secs(1));

        job.execute().await.unwrap();
        assert!(dao.get_request(&token).unwrap().is_none());
        assert_eq!(store.record_count().unwrap(), 0);
    }
}

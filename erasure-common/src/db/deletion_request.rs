use std::time::Duration;

use crate::db::{DaoError, StoreHandle};
use crate::models::deletion_reason::DeletionReason;
use crate::models::deletion_request::{DeletionRequest, NewDeletionRequest};
use crate::token;
use crate::validators::{self, Validity};

pub const DEFAULT_EXPIRY_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// The request went from pending to confirmed during this call. Carries the record
    /// as it was persisted.
    Confirmed(DeletionRequest),
    NotFound,
    Expired,
    AlreadyConfirmed,
}

/// Lifecycle manager for deletion requests. Every mutation of a stored request goes
/// through here, inside the store's exclusive lock.
#[derive(Clone)]
pub struct Dao {
    handle: StoreHandle,
    expiry_window: Duration,
}

impl Dao {
    pub fn new(handle: &StoreHandle, expiry_window: Duration) -> Self {
        Self {
            handle: handle.clone(),
            expiry_window,
        }
    }

    /// Validates the input, then checks for an active request and creates a new one as a
    /// single critical section. Returns the new request's token.
    pub fn submit_request(
        &self,
        email: &str,
        reason: &str,
        feedback: &str,
    ) -> Result<String, DaoError> {
        if let Validity::Invalid(msg) = validators::validate_email_address(email) {
            return Err(DaoError::Validation(msg));
        }

        if let Validity::Invalid(msg) = validators::validate_reason(reason) {
            return Err(DaoError::Validation(msg));
        }

        let _guard = self.handle.store.lock_exclusive()?;

        if self.has_active_request_unlocked(email)? {
            return Err(DaoError::DuplicateActiveRequest);
        }

        self.create_request_unlocked(&NewDeletionRequest {
            email,
            reason,
            feedback,
        })
    }

    /// Persists a new pending request without checking for duplicates. Callers are
    /// expected to have validated the input and ruled out an active request; use
    /// `submit_request` to get both under one lock.
    pub fn create_request(&self, new_request: &NewDeletionRequest) -> Result<String, DaoError> {
        let _guard = self.handle.store.lock_exclusive()?;
        self.create_request_unlocked(new_request)
    }

    pub fn get_request(&self, token: &str) -> Result<Option<DeletionRequest>, DaoError> {
        if !token::is_well_formed(token) {
            return Ok(None);
        }

        Ok(self.handle.store.get(token)?)
    }

    /// Expired, unconfirmed requests for `email` found along the way are deleted.
    pub fn has_active_request(&self, email: &str) -> Result<bool, DaoError> {
        let _guard = self.handle.store.lock_exclusive()?;
        self.has_active_request_unlocked(email)
    }

    pub fn confirm_request(&self, token: &str) -> Result<ConfirmOutcome, DaoError> {
        if !token::is_well_formed(token) {
            return Ok(ConfirmOutcome::NotFound);
        }

        let _guard = self.handle.store.lock_exclusive()?;

        let Some(mut request) = self.handle.store.get(token)? else {
            return Ok(ConfirmOutcome::NotFound);
        };

        if request.confirmed {
            return Ok(ConfirmOutcome::AlreadyConfirmed);
        }

        let now = self.handle.clock.now();

        if request.is_expired(now, self.expiry_window) {
            self.handle.store.delete(token)?;
            return Ok(ConfirmOutcome::Expired);
        }

        request.confirmed = true;
        request.confirmed_at = Some(now);
        self.handle.store.put(token, &request)?;

        Ok(ConfirmOutcome::Confirmed(request))
    }

    /// Removes a request that has not been confirmed. Returns whether anything was
    /// removed; confirmed requests are left alone.
    pub fn discard_request(&self, token: &str) -> Result<bool, DaoError> {
        if !token::is_well_formed(token) {
            return Ok(false);
        }

        let _guard = self.handle.store.lock_exclusive()?;

        match self.handle.store.get(token)? {
            Some(request) if !request.confirmed => {
                self.handle.store.delete(token)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Deletes every expired, unconfirmed request regardless of email. Returns how many
    /// were deleted.
    pub fn delete_expired_requests(&self) -> Result<usize, DaoError> {
        let _guard = self.handle.store.lock_exclusive()?;
        let now = self.handle.clock.now();

        let mut deleted_count = 0;

        for request in self.handle.store.list_all()? {
            if request.is_expired(now, self.expiry_window) {
                self.handle.store.delete(&request.token)?;
                deleted_count += 1;
            }
        }

        Ok(deleted_count)
    }

    fn has_active_request_unlocked(&self, email: &str) -> Result<bool, DaoError> {
        let now = self.handle.clock.now();

        for request in self.handle.store.list_all()? {
            if request.confirmed || !request.belongs_to(email) {
                continue;
            }

            if request.is_expired(now, self.expiry_window) {
                self.handle.store.delete(&request.token)?;
                continue;
            }

            return Ok(true);
        }

        Ok(false)
    }

    fn create_request_unlocked(
        &self,
        new_request: &NewDeletionRequest,
    ) -> Result<String, DaoError> {
        let token = self.handle.token_generator.generate();

        let request = DeletionRequest {
            token: token.clone(),
            email: String::from(new_request.email),
            reason: String::from(new_request.reason),
            reason_text: DeletionReason::resolve_text(new_request.reason),
            feedback: String::from(new_request.feedback),
            created_at: self.handle.clock.now(),
            confirmed: false,
            confirmed_at: None,
        };

        self.handle.store.put(&token, &request)?;

        Ok(token)
    }
}

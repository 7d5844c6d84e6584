pub mod deletion_reason;
pub mod deletion_request;

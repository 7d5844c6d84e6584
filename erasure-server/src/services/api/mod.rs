use std::time::Duration;

use actix_web::web::*;

use crate::handlers::error::HttpErrorResponse;
use crate::middleware::Limiter;

mod deletion_request;
mod health;

const MAX_BODY_BYTES: usize = 16 * 1024;

#[derive(Clone)]
pub struct RouteLimiters {
    pub submit_request: Limiter,
    pub confirm_request: Limiter,
}

impl Default for RouteLimiters {
    fn default() -> Self {
        const CLEAR_FREQUENCY: Duration = Duration::from_secs(3600 * 24);

        Self {
            submit_request: Limiter::new(5, Duration::from_secs(600), CLEAR_FREQUENCY),
            confirm_request: Limiter::new(20, Duration::from_secs(60), CLEAR_FREQUENCY),
        }
    }
}

pub fn configure(cfg: &mut ServiceConfig, limiters: RouteLimiters) {
    cfg.service(
        scope("/api")
            .app_data(
                JsonConfig::default()
                    .limit(MAX_BODY_BYTES)
                    .error_handler(|err, _req| {
                        HttpErrorResponse::IncorrectlyFormed(err.to_string()).into()
                    }),
            )
            .app_data(
                FormConfig::default()
                    .limit(MAX_BODY_BYTES)
                    .error_handler(|err, _req| {
                        HttpErrorResponse::IncorrectlyFormed(err.to_string()).into()
                    }),
            )
            .configure(|cfg| deletion_request::configure(cfg, limiters))
            .configure(health::configure),
    );
}

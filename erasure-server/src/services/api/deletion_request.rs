use actix_web::web::*;

use crate::handlers::deletion_request;

use super::RouteLimiters;

pub fn configure(cfg: &mut ServiceConfig, limiters: RouteLimiters) {
    cfg.service(
        scope("/deletion_request")
            .service(
                resource("").route(
                    post()
                        .to(deletion_request::submit)
                        .wrap(limiters.submit_request),
                ),
            )
            .service(
                resource("/confirm").route(
                    get()
                        .to(deletion_request::confirm)
                        .wrap(limiters.confirm_request),
                ),
            ),
    );
}

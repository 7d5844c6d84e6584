use erasure_common::db::deletion_request::{ConfirmOutcome, Dao};
use erasure_common::db::{DaoError, StoreHandle};
use erasure_common::email::templates::{DeletionConfirmationMessage, SupportNoticeMessage};
use erasure_common::email::{EmailMessage, EmailSender};
use erasure_common::html::templates::{
    ConfirmDeletionAlreadyConfirmedPage, ConfirmDeletionExpiredLinkPage,
    ConfirmDeletionInternalErrorPage, ConfirmDeletionInvalidLinkPage,
    ConfirmDeletionLinkMissingTokenPage, ConfirmDeletionSuccessPage,
};
use erasure_common::messages::{
    InputConfirmationToken, InputDeletionRequest, OutputDeletionRequestSubmitted,
};
use erasure_common::token::{self, TokenError};
use erasure_common::validators::{self, Validity};

use actix_web::{web, HttpRequest, HttpResponse};
use lettre::message::Mailbox;

use crate::env;
use crate::handlers::error::HttpErrorResponse;

pub async fn submit(
    store: web::Data<StoreHandle>,
    smtp_thread_pool: web::Data<EmailSender>,
    input: web::Either<web::Json<InputDeletionRequest>, web::Form<InputDeletionRequest>>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let input = match input {
        web::Either::Left(json) => json.into_inner(),
        web::Either::Right(form) => form.into_inner(),
    };

    let email = String::from(input.email.trim());
    let reason = String::from(input.reason.trim());
    let feedback = input.feedback;

    if let Validity::Invalid(msg) = validators::validate_email_address(&email) {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    if let Validity::Invalid(msg) = validators::validate_reason(&reason) {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let email_copy = email.clone();

    let dao = Dao::new(&store, env::CONF.request_expiry);
    let token = match web::block(move || dao.submit_request(&email_copy, &reason, &feedback))
        .await?
    {
        Ok(t) => t,
        Err(DaoError::DuplicateActiveRequest) => {
            return Err(HttpErrorResponse::ConflictWithExisting(String::from(
                "A deletion request for this email address is already awaiting confirmation",
            )));
        }
        Err(DaoError::Validation(msg)) => {
            return Err(HttpErrorResponse::IncorrectlyFormed(msg));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to save deletion request",
            )));
        }
    };

    let message = EmailMessage {
        body: DeletionConfirmationMessage::generate(
            &env::CONF.confirmation_url,
            &token,
            env::CONF.request_expiry,
        ),
        subject: "Confirm your account deletion request",
        from: env::CONF.email_from_address.clone(),
        reply_to: env::CONF.email_reply_to_address.clone(),
        destination: &email,
        is_html: true,
    };

    if let Err(e) = smtp_thread_pool.send(message).await {
        log::error!("{e}");

        // Without the link the requester could never confirm, and the pending request
        // would block resubmission until it expired
        let dao = Dao::new(&store, env::CONF.request_expiry);
        match web::block(move || dao.discard_request(&token)).await {
            Ok(Ok(_)) => (),
            Ok(Err(e)) => log::error!("Failed to discard unsendable deletion request: {e}"),
            Err(e) => log::error!("Failed to discard unsendable deletion request: {e}"),
        }

        return Err(HttpErrorResponse::InternalError(String::from(
            "Failed to send confirmation link to the provided email address",
        )));
    }

    Ok(HttpResponse::Created().json(OutputDeletionRequestSubmitted {
        email_sent: true,
        token_lifetime_hours: env::CONF.request_expiry.as_secs() / 3600,
    }))
}

pub async fn confirm(
    store: web::Data<StoreHandle>,
    smtp_thread_pool: web::Data<EmailSender>,
    req: HttpRequest,
) -> Result<HttpResponse, HttpErrorResponse> {
    // A garbled query string is treated the same as one without a token
    let query = web::Query::<InputConfirmationToken>::from_query(req.query_string())
        .map(|q| q.into_inner())
        .unwrap_or_default();

    let token = match token::parse(query.token.as_deref()) {
        Ok(t) => String::from(t),
        Err(TokenError::TokenMissing) => {
            return Ok(HttpResponse::BadRequest()
                .content_type("text/html")
                .body(ConfirmDeletionLinkMissingTokenPage::generate()));
        }
        Err(TokenError::TokenInvalid) => {
            return Ok(HttpResponse::NotFound()
                .content_type("text/html")
                .body(ConfirmDeletionInvalidLinkPage::generate()));
        }
    };

    let dao = Dao::new(&store, env::CONF.request_expiry);
    let outcome = match web::block(move || dao.confirm_request(&token)).await? {
        Ok(o) => o,
        Err(e) => {
            log::error!("Failed to confirm deletion request: {e}");
            return Ok(HttpResponse::InternalServerError()
                .content_type("text/html")
                .body(ConfirmDeletionInternalErrorPage::generate()));
        }
    };

    let request = match outcome {
        ConfirmOutcome::Confirmed(r) => r,
        ConfirmOutcome::NotFound => {
            return Ok(HttpResponse::NotFound()
                .content_type("text/html")
                .body(ConfirmDeletionInvalidLinkPage::generate()));
        }
        ConfirmOutcome::Expired => {
            return Ok(HttpResponse::BadRequest()
                .content_type("text/html")
                .body(ConfirmDeletionExpiredLinkPage::generate()));
        }
        ConfirmOutcome::AlreadyConfirmed => {
            return Ok(HttpResponse::BadRequest()
                .content_type("text/html")
                .body(ConfirmDeletionAlreadyConfirmedPage::generate()));
        }
    };

    let reply_to = request
        .email
        .parse::<Mailbox>()
        .unwrap_or_else(|_| env::CONF.email_reply_to_address.clone());

    let message = EmailMessage {
        body: SupportNoticeMessage::generate(&request),
        subject: "Account deletion request confirmed",
        from: env::CONF.email_from_address.clone(),
        reply_to,
        destination: &env::CONF.support_email_address,
        is_html: false,
    };

    // The confirmation is already durable, so the requester still gets the success page
    if let Err(e) = smtp_thread_pool.send(message).await {
        log::error!(
            "Failed to send support notice for confirmed deletion request {}: {e}",
            request.token,
        );
    }

    Ok(HttpResponse::Ok()
        .content_type("text/html")
        .body(ConfirmDeletionSuccessPage::generate(&request.email)))
}

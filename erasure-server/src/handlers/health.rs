use erasure_common::db::StoreHandle;
use erasure_common::messages::{InputHealthKey, OutputHealth};

use actix_web::{web, HttpResponse, Responder};

use crate::env;

pub async fn heartbeat() -> impl Responder {
    HttpResponse::Ok()
}

pub async fn health(
    store: web::Data<StoreHandle>,
    query: web::Query<InputHealthKey>,
) -> impl Responder {
    if !is_health_key_correct(query.key.as_deref()) {
        return HttpResponse::Unauthorized().finish();
    }

    let store = store.into_inner();
    let stored_request_count = match web::block(move || store.record_count()).await {
        Ok(Ok(c)) => c,
        Ok(Err(e)) => {
            log::error!("Health check failed to read the record store: {e}");
            return HttpResponse::ServiceUnavailable().finish();
        }
        Err(e) => {
            log::error!("Health check failed: {e}");
            return HttpResponse::ServiceUnavailable().finish();
        }
    };

    HttpResponse::Ok().json(OutputHealth {
        status: String::from("ok"),
        stored_request_count,
    })
}

#[inline]
fn is_health_key_correct(key: Option<&str>) -> bool {
    let Some(key) = key else {
        return false;
    };

    let correct_key = env::CONF.health_endpoint_key.as_bytes();
    let key = key.as_bytes();

    if correct_key.len() != key.len() || key.is_empty() {
        return false;
    }

    // Compare every byte so timing doesn't reveal how much of the key matched
    let keys_dont_match = correct_key
        .iter()
        .zip(key.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));

    keys_dont_match == 0
}

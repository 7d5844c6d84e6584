use std::collections::HashMap;
use std::future::{ready, Ready};
use std::net::IpAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use futures::future::LocalBoxFuture;
use tokio::sync::RwLock;

use crate::handlers::error::HttpErrorResponse;

const TABLE_COUNT: usize = 16;

#[derive(Debug)]
struct LimiterEntry {
    count: u64,
    first_access: Instant,
}

struct LimiterTable {
    map: HashMap<IpAddr, Mutex<LimiterEntry>>,
    last_clear: Instant,
}

impl LimiterTable {
    fn new() -> Self {
        LimiterTable {
            map: HashMap::new(),
            last_clear: Instant::now(),
        }
    }
}

/// Caps how many requests a single client IP can make to the wrapped route within a
/// period. Clones share counters.
#[derive(Clone)]
pub struct Limiter {
    max_per_period: u64,
    period: Duration,
    clear_frequency: Duration,
    tables: Arc<[RwLock<LimiterTable>; TABLE_COUNT]>,
}

impl Limiter {
    /// Panics if period is greater than clear frequency.
    pub fn new(max_per_period: u64, period: Duration, clear_frequency: Duration) -> Self {
        if period > clear_frequency {
            panic!("Period cannot be greater than clear frequency");
        }

        Limiter {
            max_per_period,
            period,
            clear_frequency,
            tables: Arc::new(std::array::from_fn(|_| RwLock::new(LimiterTable::new()))),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Limiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = LimiterMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LimiterMiddleware {
            service,
            limiter: self.clone(),
        }))
    }
}

pub struct LimiterMiddleware<S> {
    service: S,
    limiter: Limiter,
}

impl<S, B> Service<ServiceRequest> for LimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let Some(ip) = client_ip(&req) else {
            log::warn!("Request without a peer address bypassed the rate limiter");
            return Box::pin(self.service.call(req));
        };

        let final_octet = match ip {
            IpAddr::V4(ip) => ip.octets()[3],
            IpAddr::V6(ip) => ip.octets()[15],
        };

        let tables = Arc::clone(&self.limiter.tables);
        let table_index = (final_octet as usize) % TABLE_COUNT;

        let max_per_period = self.limiter.max_per_period;
        let period = self.limiter.period;
        let clear_frequency = self.limiter.clear_frequency;

        let req_fut = self.service.call(req);

        Box::pin(async move {
            let table = &tables[table_index];
            let now = Instant::now();

            let found_ip = {
                // Scoped so the read lock is dropped before the write lock is acquired
                let table = table.read().await;

                if let Some(entry) = table.map.get(&ip) {
                    let mut entry = entry.lock().unwrap_or_else(PoisonError::into_inner);

                    if entry.first_access + period < now {
                        entry.first_access = now;
                        entry.count = 1;
                    } else {
                        if entry.count >= max_per_period {
                            return Err(HttpErrorResponse::TooManyRequests(String::from(
                                "Please try again later",
                            ))
                            .into());
                        }

                        entry.count += 1;
                    }

                    true
                } else {
                    false
                }
            };

            if !found_ip {
                let mut table = table.write().await;

                if now > table.last_clear + clear_frequency {
                    table.map.clear();
                    table.map.shrink_to_fit();
                    table.last_clear = now;
                }

                table
                    .map
                    .entry(ip)
                    .and_modify(|entry| {
                        // Another request from this IP got the write lock first
                        entry.get_mut().unwrap_or_else(PoisonError::into_inner).count += 1;
                    })
                    .or_insert_with(|| {
                        Mutex::new(LimiterEntry {
                            count: 1,
                            first_access: now,
                        })
                    });
            }

            req_fut.await
        })
    }
}

#[cfg(not(test))]
fn client_ip(req: &ServiceRequest) -> Option<IpAddr> {
    req.peer_addr().map(|addr| addr.ip())
}

/// Tests have no peer address. A `test-ip` header stands in for one.
#[cfg(test)]
fn client_ip(req: &ServiceRequest) -> Option<IpAddr> {
    let ip = req
        .headers()
        .get("test-ip")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("127.0.0.1");

    ip.parse().ok()
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header;
use actix_web::middleware::Next;
use actix_web::{web, Error, HttpResponse};
use governor::clock::{Clock, DefaultClock, Reference};

use crate::config::RateLimitSettings;
use crate::models::envelope::Envelope;

const RETAIN_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window<I> {
    started: I,
    count: u32,
}

/// Fixed-window request budget per client address, shared by every route: at
/// most `max_requests` per `window`, where a window opens with the client's
/// first request after the previous one closed.
#[derive(Clone)]
pub struct RateLimit<C: Clock = DefaultClock> {
    windows: Arc<Mutex<HashMap<String, Window<C::Instant>>>>,
    max_requests: u32,
    window: Duration,
    clock: C,
}

impl RateLimit {
    pub fn new(settings: &RateLimitSettings) -> Self {
        Self::with_clock(settings, DefaultClock::default())
    }
}

impl<C: Clock> RateLimit<C> {
    pub fn with_clock(settings: &RateLimitSettings, clock: C) -> Self {
        Self {
            windows: Arc::default(),
            max_requests: settings.max_requests.max(1),
            window: settings.window,
            clock,
        }
    }

    /// `Err` carries the time left until the client's window closes.
    pub fn check(&self, client: &str) -> Result<(), Duration> {
        let now = self.clock.now();
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        if windows.len() > RETAIN_THRESHOLD {
            windows.retain(|_, window| self.elapsed(window, now) < self.window);
        }

        let window = windows.entry(client.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if self.elapsed(window, now) >= self.window {
            *window = Window {
                started: now,
                count: 0,
            };
        }
        if window.count >= self.max_requests {
            return Err(self.window.saturating_sub(self.elapsed(window, now)));
        }
        window.count += 1;
        Ok(())
    }

    fn elapsed(&self, window: &Window<C::Instant>, now: C::Instant) -> Duration {
        now.duration_since(window.started).into()
    }
}

fn client_key(req: &ServiceRequest) -> String {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rejects requests over budget with 429. Passes everything through when no
/// [`RateLimit`] is registered as app data.
pub async fn enforce<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error>
where
    B: MessageBody + 'static,
{
    let verdict = req
        .app_data::<web::Data<RateLimit>>()
        .map(|limit| limit.check(&client_key(&req)));

    if let Some(Err(wait)) = verdict {
        tracing::warn!(client = %client_key(&req), path = req.path(), "rate limit exceeded");
        let retry_after = (wait.as_secs() + u64::from(wait.subsec_nanos() > 0)).max(1);
        let response = HttpResponse::TooManyRequests()
            .insert_header((header::RETRY_AFTER, retry_after.to_string()))
            .json(Envelope::failure("Too many requests, please try again later."));
        return Ok(req.into_response(response).map_into_right_body());
    }

    Ok(next.call(req).await?.map_into_left_body())
}

//! Per-client rate limiting for the generation route.

use governor::{DefaultKeyedRateLimiter, Quota};
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::time::Duration;

pub struct RateLimiter {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
    requests_per_minute: u32,
}

impl RateLimiter {
    /// A zero budget is raised to one request per minute.
    pub fn per_minute(requests_per_minute: usize) -> Self {
        let rpm = u32::try_from(requests_per_minute)
            .ok()
            .and_then(NonZeroU32::new)
            .unwrap_or(NonZeroU32::MIN);

        Self {
            limiter: DefaultKeyedRateLimiter::keyed(Quota::per_minute(rpm)),
            requests_per_minute: rpm.get(),
        }
    }

    /// `burst` requests, replenished one per `period`.
    pub fn with_period(burst: u32, period: Duration) -> Self {
        let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(burst);

        Self {
            limiter: DefaultKeyedRateLimiter::keyed(quota),
            requests_per_minute: burst.get(),
        }
    }

    pub fn requests_per_minute(&self) -> u32 {
        self.requests_per_minute
    }

    /// Records a request for `client` if it is within budget.
    pub fn try_acquire(&self, client: IpAddr) -> bool {
        self.limiter.check_key(&client).is_ok()
    }

    /// Forgets clients whose budget has fully replenished.
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}

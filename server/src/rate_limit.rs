use axum::http::StatusCode;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

const BURST: Duration = Duration::from_secs(10);
const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(60 * 60 * 24);

/// How many requests one address may make per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLimits {
    pub burst: usize,
    pub hour: usize,
    pub day: usize,
}

pub const COMMENT_LIMITS: WindowLimits = WindowLimits {
    burst: 3,
    hour: 20,
    day: 60,
};

pub const LOGIN_LIMITS: WindowLimits = WindowLimits {
    burst: 5,
    hour: 30,
    day: 100,
};

/// Sliding-window limiter keyed by client address.
pub struct RateLimiter {
    limits: WindowLimits,
    per_ip: HashMap<String, IpWindows>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageSnapshot {
    pub burst: usize,
    pub hour: usize,
    pub day: usize,
}

struct IpWindows {
    burst: CountWindow,
    hour: CountWindow,
    day: CountWindow,
}

struct CountWindow {
    duration: Duration,
    limit: usize,
    entries: VecDeque<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitError {
    PerIpBurst,
    PerIpHour,
    PerIpDay,
}

impl RateLimiter {
    pub fn new(limits: WindowLimits) -> Self {
        Self {
            limits,
            per_ip: HashMap::new(),
        }
    }

    pub fn check_and_record(&mut self, ip: &str) -> Result<(), RateLimitError> {
        self.check_and_record_at(ip, Instant::now())
    }

    pub fn check_and_record_at(&mut self, ip: &str, now: Instant) -> Result<(), RateLimitError> {
        let limits = self.limits;
        let ip_windows = self
            .per_ip
            .entry(ip.to_string())
            .or_insert_with(|| IpWindows::new(limits));
        if ip_windows.burst.would_exceed(now) {
            return Err(RateLimitError::PerIpBurst);
        }
        if ip_windows.hour.would_exceed(now) {
            return Err(RateLimitError::PerIpHour);
        }
        if ip_windows.day.would_exceed(now) {
            return Err(RateLimitError::PerIpDay);
        }

        ip_windows.burst.record(now);
        ip_windows.hour.record(now);
        ip_windows.day.record(now);
        Ok(())
    }

    pub fn usage_snapshot(&self, ip: &str) -> UsageSnapshot {
        let ip_windows = self.per_ip.get(ip);
        UsageSnapshot {
            burst: ip_windows.map(|w| w.burst.entries.len()).unwrap_or(0),
            hour: ip_windows.map(|w| w.hour.entries.len()).unwrap_or(0),
            day: ip_windows.map(|w| w.day.entries.len()).unwrap_or(0),
        }
    }
}

impl RateLimitError {
    pub fn describe(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            RateLimitError::PerIpBurst => (
                StatusCode::TOO_MANY_REQUESTS,
                "per_ip_burst",
                "Slow down a little before trying again.",
            ),
            RateLimitError::PerIpHour => (
                StatusCode::TOO_MANY_REQUESTS,
                "per_ip_hour",
                "Hourly request limit reached.",
            ),
            RateLimitError::PerIpDay => (
                StatusCode::TOO_MANY_REQUESTS,
                "per_ip_day",
                "Daily request limit reached.",
            ),
        }
    }
}

impl IpWindows {
    fn new(limits: WindowLimits) -> Self {
        Self {
            burst: CountWindow::new(BURST, limits.burst),
            hour: CountWindow::new(HOUR, limits.hour),
            day: CountWindow::new(DAY, limits.day),
        }
    }
}

impl CountWindow {
    fn new(duration: Duration, limit: usize) -> Self {
        Self {
            duration,
            limit,
            entries: VecDeque::new(),
        }
    }

    fn prune(&mut self, now: Instant) {
        while let Some(timestamp) = self.entries.front().copied() {
            if now.duration_since(timestamp) > self.duration {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    fn would_exceed(&mut self, now: Instant) -> bool {
        self.prune(now);
        self.entries.len() >= self.limit
    }

    fn record(&mut self, now: Instant) {
        self.entries.push_back(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_beyond_window_limit_is_refused() {
        let mut limiter = RateLimiter::new(COMMENT_LIMITS);
        let ip = "127.0.0.1";
        let start = Instant::now();
        for _ in 0..COMMENT_LIMITS.burst {
            limiter.check_and_record_at(ip, start).unwrap();
        }
        assert_eq!(
            limiter.check_and_record_at(ip, start).unwrap_err(),
            RateLimitError::PerIpBurst
        );

        let later = start + BURST + Duration::from_millis(10);
        assert!(limiter.check_and_record_at(ip, later).is_ok());
    }

    #[test]
    fn hourly_limit_applies_across_bursts() {
        let mut limiter = RateLimiter::new(COMMENT_LIMITS);
        let ip = "192.168.0.5";
        let start = Instant::now();
        let spacing = BURST + Duration::from_secs(1);
        for attempt in 0..COMMENT_LIMITS.hour {
            let at = start + spacing * attempt as u32;
            limiter.check_and_record_at(ip, at).unwrap();
        }
        let next = start + spacing * COMMENT_LIMITS.hour as u32;
        assert_eq!(
            limiter.check_and_record_at(ip, next).unwrap_err(),
            RateLimitError::PerIpHour
        );
    }

    #[test]
    fn addresses_are_limited_independently() {
        let mut limiter = RateLimiter::new(COMMENT_LIMITS);
        let now = Instant::now();
        for _ in 0..COMMENT_LIMITS.burst {
            limiter.check_and_record_at("203.0.113.4", now).unwrap();
        }
        assert!(limiter.check_and_record_at("203.0.113.5", now).is_ok());

        let snapshot = limiter.usage_snapshot("203.0.113.4");
        assert_eq!(snapshot.burst, COMMENT_LIMITS.burst);
        assert_eq!(snapshot.day, COMMENT_LIMITS.burst);
        assert_eq!(limiter.usage_snapshot("198.51.100.1").hour, 0);
    }

    #[test]
    fn login_limiter_refuses_beyond_its_burst() {
        let mut limiter = RateLimiter::new(LOGIN_LIMITS);
        let now = Instant::now();
        for _ in 0..LOGIN_LIMITS.burst {
            limiter.check_and_record_at("198.51.100.7", now).unwrap();
        }
        assert_eq!(
            limiter.check_and_record_at("198.51.100.7", now).unwrap_err(),
            RateLimitError::PerIpBurst
        );
    }

    #[test]
    fn refusals_map_to_too_many_requests() {
        let (status, reason, _) = RateLimitError::PerIpDay.describe();
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(reason, "per_ip_day");
    }
}

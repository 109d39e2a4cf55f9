//! Heartbeat ("pulse") rate limiting.
//!
//! A requester under monitoring can tap "I'm still here". Each send takes a
//! moment and is followed by a fixed cooldown during which no further pulse
//! may start. Instants are passed in so the limiter is clock-agnostic.

use std::time::Duration;

use tokio::time::Instant;

/// Default time between pulses.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

/// Why a pulse may not start right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseBlocked {
    /// A pulse is already being sent.
    InFlight,
    /// The cooldown has this much time left.
    Cooldown(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ready,
    InFlight,
    CoolingDown { until: Instant },
}

/// Rate limiter for a single request's pulses.
#[derive(Debug, Clone)]
pub struct PulseLimiter {
    cooldown: Duration,
    state: State,
}

impl PulseLimiter {
    /// Create a limiter with the given cooldown.
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            state: State::Ready,
        }
    }

    /// The configured cooldown.
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Claim the right to send a pulse.
    ///
    /// # Errors
    ///
    /// Returns why the pulse is blocked if one is in flight or cooling down.
    pub fn try_begin(&mut self, now: Instant) -> Result<(), PulseBlocked> {
        match self.state {
            State::InFlight => Err(PulseBlocked::InFlight),
            State::CoolingDown { until } if now < until => {
                Err(PulseBlocked::Cooldown(until - now))
            }
            State::Ready | State::CoolingDown { .. } => {
                self.state = State::InFlight;
                Ok(())
            }
        }
    }

    /// Record a successful send; the cooldown starts at `now`.
    pub fn complete(&mut self, now: Instant) {
        self.state = State::CoolingDown {
            until: now + self.cooldown,
        };
    }

    /// Release an in-flight claim without starting the cooldown.
    pub fn abort(&mut self) {
        if self.state == State::InFlight {
            self.state = State::Ready;
        }
    }

    /// Whether a pulse is currently being sent.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.state == State::InFlight
    }

    /// Time left before the next pulse may start.
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.state {
            State::CoolingDown { until } => until.saturating_duration_since(now),
            State::Ready | State::InFlight => Duration::ZERO,
        }
    }

    /// Countdown in whole seconds, rounded up, as shown on the pulse button.
    #[must_use]
    pub fn remaining_secs(&self, now: Instant) -> u64 {
        let remaining = self.remaining(now);
        let secs = remaining.as_secs();
        if remaining.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}

impl Default for PulseLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

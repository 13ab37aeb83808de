use std::time::Duration;

pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;
pub const BASE_RECONNECT_DELAY_MS: u64 = 1000;

/// Where the reconnect procedure goes next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectStep {
    /// Sleep for `delay`, then make reconnect attempt number `attempt`
    /// (1-based).
    Retry { attempt: u32, delay: Duration },

    /// The ceiling was reached; no further attempts.
    Exhausted { attempts: u32 },
}

/// Consecutive reconnect bookkeeping. The delay doubles per attempt with no
/// jitter and no cap below the attempt ceiling: 1s, 2s, 4s, ... 512s.
#[derive(Debug, Clone)]
pub struct ReconnectState {
    attempts: u32,
    max_attempts: u32,
    base_delay_ms: u64,
}

impl Default for ReconnectState {
    fn default() -> Self {
        Self::new(MAX_RECONNECT_ATTEMPTS, BASE_RECONNECT_DELAY_MS)
    }
}

impl ReconnectState {
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            attempts: 0,
            max_attempts,
            base_delay_ms,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    pub fn current_delay(&self) -> Duration {
        let multiplier = 1_u64.checked_shl(self.attempts).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(multiplier))
    }

    /// Decides the next transition and, when retrying, counts the attempt.
    pub fn next_step(&mut self) -> ReconnectStep {
        if self.is_exhausted() {
            return ReconnectStep::Exhausted {
                attempts: self.attempts,
            };
        }

        let delay = self.current_delay();
        self.attempts += 1;

        ReconnectStep::Retry {
            attempt: self.attempts,
            delay,
        }
    }

    /// Only a fully established session may call this.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_from_base() {
        let mut state = ReconnectState::default();

        for n in 0..MAX_RECONNECT_ATTEMPTS {
            match state.next_step() {
                ReconnectStep::Retry { attempt, delay } => {
                    assert_eq!(attempt, n + 1);
                    assert_eq!(delay, Duration::from_millis(1000 * 2_u64.pow(n)));
                }
                ReconnectStep::Exhausted { .. } => panic!("exhausted early at {n}"),
            }
        }
    }

    #[test]
    fn test_last_delay_is_512_seconds() {
        let mut state = ReconnectState::default();
        let mut last = Duration::ZERO;
        while let ReconnectStep::Retry { delay, .. } = state.next_step() {
            last = delay;
        }
        assert_eq!(last, Duration::from_secs(512));
    }

    #[test]
    fn test_exhausted_after_ceiling() {
        let mut state = ReconnectState::default();
        for _ in 0..MAX_RECONNECT_ATTEMPTS {
            state.next_step();
        }

        assert!(state.is_exhausted());
        assert_eq!(
            state.next_step(),
            ReconnectStep::Exhausted { attempts: 10 }
        );
        // Stays exhausted; the counter does not move past the ceiling.
        assert_eq!(
            state.next_step(),
            ReconnectStep::Exhausted { attempts: 10 }
        );
    }

    #[test]
    fn test_reset_restarts_backoff() {
        let mut state = ReconnectState::default();
        for _ in 0..7 {
            state.next_step();
        }
        assert_eq!(state.attempts(), 7);

        state.reset();

        assert_eq!(state.attempts(), 0);
        assert_eq!(
            state.next_step(),
            ReconnectStep::Retry {
                attempt: 1,
                delay: Duration::from_millis(1000),
            }
        );
    }

    #[test]
    fn test_large_exponent_saturates() {
        let state = ReconnectState {
            attempts: 70,
            max_attempts: 100,
            base_delay_ms: 1000,
        };
        assert_eq!(state.current_delay(), Duration::from_millis(u64::MAX));
    }
}

//! Socket connection state machine with exponential reconnect backoff.
//!
//! Pure and clock-free: the owner schedules the returned delays. State:
//! `Connecting -> Open -> Closed`, re-entering `Connecting` on each retry.
//! The attempt counter resets only on reaching `Open`; once the budget is
//! exhausted the machine stays `Closed` and every further close yields
//! `GiveUp`.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SocketState {
    Connecting,
    Open,
    Closed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay_ms: u64,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy {
            base_delay_ms: 1_000,
            max_attempts: 5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Schedule a reconnect attempt after this delay.
    Reconnect { delay_ms: u64 },
    /// Budget exhausted; only an explicit re-init recovers the connection.
    GiveUp,
}

#[derive(Debug)]
pub struct Connection {
    state: SocketState,
    attempts: u32,
    policy: ReconnectPolicy,
}

impl Connection {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Connection {
            state: SocketState::Connecting,
            attempts: 0,
            policy,
        }
    }

    pub fn state(&self) -> SocketState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_open(&self) -> bool {
        self.state == SocketState::Open
    }

    /// A reconnect attempt is starting.
    pub fn reconnecting(&mut self) {
        self.state = SocketState::Connecting;
    }

    pub fn on_open(&mut self) {
        self.state = SocketState::Open;
        self.attempts = 0;
    }

    /// The socket closed or errored. Attempt `n` is scheduled after
    /// `base * 2^(n-1)`.
    pub fn on_closed(&mut self) -> CloseOutcome {
        self.state = SocketState::Closed;
        if self.attempts >= self.policy.max_attempts {
            return CloseOutcome::GiveUp;
        }
        self.attempts += 1;
        let delay_ms = self
            .policy
            .base_delay_ms
            .saturating_mul(1u64 << (self.attempts - 1).min(63));
        CloseOutcome::Reconnect { delay_ms }
    }
}

#[cfg(test)]
mod tests {
    use super::{CloseOutcome, Connection, ReconnectPolicy, SocketState};

    #[test]
    fn backoff_doubles_per_attempt_and_gives_up_after_max() {
        let mut conn = Connection::new(ReconnectPolicy::default());
        let mut delays = Vec::new();
        loop {
            match conn.on_closed() {
                CloseOutcome::Reconnect { delay_ms } => {
                    delays.push(delay_ms);
                    conn.reconnecting();
                }
                CloseOutcome::GiveUp => break,
            }
        }
        assert_eq!(delays, vec![1_000, 2_000, 4_000, 8_000, 16_000]);
        assert_eq!(conn.state(), SocketState::Closed);
        // give-up is terminal
        assert_eq!(conn.on_closed(), CloseOutcome::GiveUp);
    }

    #[test]
    fn open_resets_the_attempt_counter() {
        let mut conn = Connection::new(ReconnectPolicy::default());
        assert!(matches!(
            conn.on_closed(),
            CloseOutcome::Reconnect { delay_ms: 1_000 }
        ));
        assert!(matches!(
            conn.on_closed(),
            CloseOutcome::Reconnect { delay_ms: 2_000 }
        ));
        conn.on_open();
        assert_eq!(conn.attempts(), 0);
        // a later drop starts over at the base delay
        assert!(matches!(
            conn.on_closed(),
            CloseOutcome::Reconnect { delay_ms: 1_000 }
        ));
    }
}

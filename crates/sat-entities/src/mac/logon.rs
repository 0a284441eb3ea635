use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sat_core::SimTime;

/// Logon state of the terminal.
///
/// A logon request may only leave when the randomized retry window has
/// reopened. Each unanswered request widens the window, the draw range
/// doubles per retry up to a cap, on top of the fixed response timeout.
/// Retries are unbounded.
pub struct LogonMachine {
    logged_on: bool,
    window_init: SimTime,
    max_waiting_time: SimTime,
    next_allowed: SimTime,
    retries_sent: u32,
    rng: StdRng,
}

/// Growth cap, beyond this many unanswered tries the draw range stays put.
const MAX_WINDOW_DOUBLINGS: u32 = 10;

impl LogonMachine {
    pub fn new(window_init: SimTime, max_waiting_time: SimTime, seed: u64) -> Self {
        Self {
            logged_on: false,
            window_init,
            max_waiting_time,
            next_allowed: SimTime::ZERO,
            retries_sent: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn is_logged_on(&self) -> bool {
        self.logged_on
    }

    pub fn retries_sent(&self) -> u32 {
        self.retries_sent
    }

    pub fn next_allowed(&self) -> SimTime {
        self.next_allowed
    }

    /// True when a logon request may be transmitted now.
    pub fn transmission_possible(&self, now: SimTime) -> bool {
        !self.logged_on && now >= self.next_allowed
    }

    /// Registers a sent request: closes the window for the response timeout
    /// plus a uniform draw from the widened retry range.
    pub fn request_sent(&mut self, now: SimTime) {
        let exponent = self.retries_sent.min(MAX_WINDOW_DOUBLINGS);
        let window = self.window_init * (1u64 << exponent);
        let wait = SimTime::from_nanos(self.rng.random_range(0..=window.as_nanos()));
        self.next_allowed = now + self.max_waiting_time + wait;
        self.retries_sent += 1;
        tracing::debug!(
            "logon request {} sent, next attempt possible at {}",
            self.retries_sent, self.next_allowed
        );
    }

    pub fn response_received(&mut self) {
        tracing::info!("logon response received after {} request(s)", self.retries_sent);
        self.logged_on = true;
        self.retries_sent = 0;
    }

    /// Back to the initial not-logged-on state, window immediately open.
    pub fn log_off(&mut self) {
        tracing::info!("logged off");
        self.logged_on = false;
        self.retries_sent = 0;
        self.next_allowed = SimTime::ZERO;
    }
}

use core::fmt;
use core::ops::{Add, AddAssign, Mul, Sub};

/// Simulated-clock instant or duration, in nanoseconds since stack start.
///
/// A single type is used for both instants and durations, in the style of
/// discrete-event simulators. All arithmetic is integer arithmetic; there is
/// no drift and no rounding other than in the explicit `as_*` accessors.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimTime {
    ns: u64,
}

impl SimTime {
    pub const ZERO: SimTime = SimTime { ns: 0 };

    pub const fn from_nanos(ns: u64) -> SimTime {
        SimTime { ns }
    }

    pub const fn from_micros(us: u64) -> SimTime {
        SimTime { ns: us * 1_000 }
    }

    pub const fn from_millis(ms: u64) -> SimTime {
        SimTime { ns: ms * 1_000_000 }
    }

    pub const fn from_secs(s: u64) -> SimTime {
        SimTime { ns: s * 1_000_000_000 }
    }

    pub const fn as_nanos(self) -> u64 {
        self.ns
    }

    pub const fn as_micros(self) -> u64 {
        self.ns / 1_000
    }

    pub const fn as_millis(self) -> u64 {
        self.ns / 1_000_000
    }

    pub fn as_secs_f64(self) -> f64 {
        self.ns as f64 / 1e9
    }

    pub const fn is_zero(self) -> bool {
        self.ns == 0
    }

    /// Subtraction clamped at zero, for guard-time style adjustments
    pub const fn saturating_sub(self, rhs: SimTime) -> SimTime {
        SimTime { ns: self.ns.saturating_sub(rhs.ns) }
    }

    pub const fn checked_sub(self, rhs: SimTime) -> Option<SimTime> {
        match self.ns.checked_sub(rhs.ns) {
            Some(ns) => Some(SimTime { ns }),
            None => None,
        }
    }

    /// Integer division of a duration, e.g. a frame duration by its slot count
    pub const fn div_by(self, divisor: u64) -> SimTime {
        SimTime { ns: self.ns / divisor }
    }
}

impl Add for SimTime {
    type Output = SimTime;
    fn add(self, rhs: SimTime) -> SimTime {
        SimTime { ns: self.ns + rhs.ns }
    }
}

impl AddAssign for SimTime {
    fn add_assign(&mut self, rhs: SimTime) {
        self.ns += rhs.ns;
    }
}

impl Sub for SimTime {
    type Output = SimTime;
    fn sub(self, rhs: SimTime) -> SimTime {
        SimTime { ns: self.ns - rhs.ns }
    }
}

impl Mul<u64> for SimTime {
    type Output = SimTime;
    fn mul(self, rhs: u64) -> SimTime {
        SimTime { ns: self.ns * rhs }
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}s", self.ns / 1_000_000_000, (self.ns % 1_000_000_000) / 1_000)
    }
}

impl fmt::Debug for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}s", self.ns / 1_000_000_000, (self.ns % 1_000_000_000) / 1_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(SimTime::from_micros(1).as_nanos(), 1_000);
        assert_eq!(SimTime::from_millis(26).as_micros(), 26_000);
        assert_eq!(SimTime::from_secs(2).as_millis(), 2_000);
        assert_eq!(SimTime::ZERO.as_nanos(), 0);
        assert!(SimTime::ZERO.is_zero());
    }

    #[test]
    fn test_arithmetic() {
        let a = SimTime::from_millis(100);
        let b = SimTime::from_millis(30);
        assert_eq!(a + b, SimTime::from_millis(130));
        assert_eq!(a - b, SimTime::from_millis(70));
        assert_eq!(b * 4, SimTime::from_millis(120));
        assert_eq!(a.div_by(4), SimTime::from_millis(25));

        let mut c = a;
        c += b;
        assert_eq!(c, SimTime::from_millis(130));
    }

    #[test]
    fn test_saturating_and_checked_sub() {
        let a = SimTime::from_millis(5);
        let b = SimTime::from_millis(8);
        assert_eq!(a.saturating_sub(b), SimTime::ZERO);
        assert_eq!(b.saturating_sub(a), SimTime::from_millis(3));
        assert_eq!(a.checked_sub(b), None);
        assert_eq!(b.checked_sub(a), Some(SimTime::from_millis(3)));
    }

    #[test]
    fn test_ordering() {
        let a = SimTime::from_micros(999);
        let b = SimTime::from_millis(1);
        assert!(a < b);
        assert_eq!(a.max(b), b);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", SimTime::from_millis(1_500)), "1.500000s");
        assert_eq!(format!("{}", SimTime::from_micros(25)), "0.000025s");
    }
}

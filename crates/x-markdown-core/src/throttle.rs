use std::time::Duration;
use std::time::Instant;

/// Leading + trailing edge throttle for caller-driven event loops.
///
/// The first value in a quiet period fires immediately. Values offered within `interval` of the
/// last firing are held (latest wins) until [`Throttle::flush`] sees the interval elapse.
#[derive(Clone, Debug)]
pub struct Throttle<T> {
    interval: Duration,
    last_fired: Option<Instant>,
    pending: Option<T>,
}

impl<T> Throttle<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fired: None,
            pending: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn offer(&mut self, value: T, now: Instant) -> Option<T> {
        match self.last_fired {
            Some(last) if now.saturating_duration_since(last) < self.interval => {
                self.pending = Some(value);
                None
            }
            _ => {
                self.last_fired = Some(now);
                self.pending = None;
                Some(value)
            }
        }
    }

    pub fn flush(&mut self, now: Instant) -> Option<T> {
        let last = self.last_fired?;
        if self.pending.is_none() || now.saturating_duration_since(last) < self.interval {
            return None;
        }
        self.last_fired = Some(now);
        self.pending.take()
    }

    /// When the held trailing value becomes due, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref()?;
        self.last_fired.map(|last| last + self.interval)
    }

    pub fn reset(&mut self) {
        self.last_fired = None;
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_then_trailing() {
        let t0 = Instant::now();
        let ms = Duration::from_millis;
        let mut t = Throttle::new(ms(20));

        assert_eq!(t.offer(1, t0), Some(1));
        assert_eq!(t.offer(2, t0 + ms(5)), None);
        assert_eq!(t.offer(3, t0 + ms(10)), None);
        assert_eq!(t.deadline(), Some(t0 + ms(20)));
        assert_eq!(t.flush(t0 + ms(15)), None);
        assert_eq!(t.flush(t0 + ms(20)), Some(3));
        assert_eq!(t.flush(t0 + ms(60)), None);
        assert_eq!(t.offer(4, t0 + ms(60)), Some(4));
    }

    #[test]
    fn reset_forgets_history() {
        let t0 = Instant::now();
        let mut t = Throttle::new(Duration::from_millis(20));
        assert_eq!(t.offer('a', t0), Some('a'));
        assert_eq!(t.offer('b', t0), None);
        t.reset();
        assert_eq!(t.deadline(), None);
        assert_eq!(t.offer('c', t0), Some('c'));
    }
}

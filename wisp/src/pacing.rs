use std::time::Duration;
use std::time::Instant;

use tracing::debug;

/// Keeps the runner presenting frames at a fixed rate. The deadline advances by exactly one
/// period per frame so that small oversleeps do not drift; after a stall longer than a frame it
/// starts over from now rather than rushing to catch up.
#[derive(Debug, Clone)]
pub struct Pacer {
    period: Duration,
    deadline: Instant,
}

impl Pacer {
    pub fn new(frame_rate: f64) -> Self {
        let period = Duration::from_secs_f64(1.0 / frame_rate);
        Self {
            period,
            deadline: Instant::now() + period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Blocks until the current frame's deadline.
    pub fn wait(&mut self) {
        if let Some(delay) = self.advance(Instant::now()) {
            std::thread::sleep(delay);
        }
    }

    /// Moves the deadline on by a frame and returns how long to sleep from `now`.
    fn advance(&mut self, now: Instant) -> Option<Duration> {
        let delay = self.deadline.checked_duration_since(now);
        if delay.is_none() && now.duration_since(self.deadline) > self.period {
            debug!(
                "Fell {:?} behind, resynchronising",
                now.duration_since(self.deadline)
            );
            self.deadline = now + self.period;
            return None;
        }
        self.deadline += self.period;
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_matches_rate() {
        let pacer = Pacer::new(50.0);
        assert_eq!(pacer.period(), Duration::from_millis(20));
    }

    #[test]
    fn early_frames_sleep_until_the_deadline() {
        let mut pacer = Pacer::new(50.0);
        let start = pacer.deadline - Duration::from_millis(15);
        assert_eq!(pacer.advance(start), Some(Duration::from_millis(15)));
        // The next deadline is a full period after the previous one, not after `start`
        assert_eq!(pacer.advance(start), Some(Duration::from_millis(35)));
    }

    #[test]
    fn slightly_late_frames_keep_the_schedule() {
        let mut pacer = Pacer::new(50.0);
        let first = pacer.deadline;
        assert_eq!(pacer.advance(first + Duration::from_millis(5)), None);
        assert_eq!(pacer.deadline, first + Duration::from_millis(20));
    }

    #[test]
    fn long_stalls_resynchronise() {
        let mut pacer = Pacer::new(50.0);
        let now = pacer.deadline + Duration::from_millis(500);
        assert_eq!(pacer.advance(now), None);
        assert_eq!(pacer.deadline, now + Duration::from_millis(20));
        assert_eq!(
            pacer.advance(now + Duration::from_millis(1)),
            Some(Duration::from_millis(19))
        );
    }
}

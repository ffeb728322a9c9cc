use std::time::Duration;

/// Reconnect delays: walks the schedule once, then repeats its last entry.
#[derive(Debug, Clone)]
pub struct Backoff {
    schedule: Vec<Duration>,
    next: usize,
}

impl Backoff {
    pub fn new(schedule: Vec<Duration>) -> Self {
        let schedule = if schedule.is_empty() {
            vec![Duration::from_secs(1)]
        } else {
            schedule
        };
        Self { schedule, next: 0 }
    }

    pub fn next_delay(&mut self) -> Duration {
        let idx = self.next.min(self.schedule.len() - 1);
        self.next = self.next.saturating_add(1);
        self.schedule[idx]
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(crate::config::printer_config::ClientTimings::default().backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(b: &mut Backoff, n: usize) -> Vec<u64> {
        (0..n).map(|_| b.next_delay().as_secs()).collect()
    }

    #[test]
    fn walks_schedule_then_repeats_last() {
        let mut b = Backoff::default();
        assert_eq!(secs(&mut b, 9), vec![1, 2, 5, 10, 20, 30, 30, 30, 30]);
    }

    #[test]
    fn reset_starts_over() {
        let mut b = Backoff::default();
        secs(&mut b, 4);
        b.reset();
        assert_eq!(secs(&mut b, 3), vec![1, 2, 5]);
    }

    #[test]
    fn empty_schedule_still_waits() {
        let mut b = Backoff::new(vec![]);
        assert_eq!(b.next_delay(), Duration::from_secs(1));
        assert_eq!(b.next_delay(), Duration::from_secs(1));
    }
}

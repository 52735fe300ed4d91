//! Time source for TTL checks

use chrono::{DateTime, Utc};

/// Wall-clock source; swapped for a manual clock in tests
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use chrono::Duration;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Clock that only moves when told to; clones share the same time
    #[derive(Debug, Clone)]
    pub(crate) struct ManualClock(Rc<Cell<DateTime<Utc>>>);

    impl ManualClock {
        pub(crate) fn new() -> Self {
            let start = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());
            Self(Rc::new(Cell::new(start)))
        }

        pub(crate) fn advance(&self, by: Duration) {
            self.0.set(self.0.get() + by);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            self.0.get()
        }
    }
}

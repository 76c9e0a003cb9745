use chrono::{DateTime, FixedOffset, Utc};

/// Source of the simulation start instant, expressed in the reference zone.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

#[derive(Copy, Clone, Debug)]
pub struct SystemClock {
    pub offset: FixedOffset,
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct FixedClock {
    pub instant: DateTime<FixedOffset>,
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.instant
    }
}

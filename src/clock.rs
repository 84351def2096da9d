use chrono::{DateTime, Local, NaiveDate, Utc};
use tokio::time::Instant;

/// Source of wall time and monotonic instants, so tests can pin both.
pub trait Clock: Send + Sync + 'static {
    fn time(&self) -> DateTime<Utc>;

    fn instant(&self) -> Instant;

    fn today(&self) -> NaiveDate {
        self.time().with_timezone(&Local).date_naive()
    }
}

pub struct DefaultClock;

impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }
}

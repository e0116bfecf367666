/// Upload and display window arithmetic
///
/// Every photo uploaded during the 12:00 -> 12:00 daily cycle is shown on the
/// board during the next 06:00 -> 12:00 morning slot. All boundaries are wall
/// clock times in the board's own calendar, so day rollovers go through the
/// calendar (next date at 06:00) instead of adding 24 hours.
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// First hour of the morning display slot
pub const DISPLAY_START_HOUR: u32 = 6;
/// Display slot end (exclusive)
pub const DISPLAY_END_HOUR: u32 = 12;
/// The daily cycle turns over at noon
pub const CYCLE_HOUR: u32 = 12;
/// Historical upload window closed at 06:00 the next morning
pub const UPLOAD_CLOSE_HOUR: u32 = 6;

/// Half-open instant interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        is_within(instant, self.start, self.end)
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Start inclusive, end exclusive
pub fn is_within(instant: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    instant >= start && instant < end
}

/// Window math bound to one calendar.
///
/// The zone is explicit configuration; the host locale is never consulted.
#[derive(Debug, Clone)]
pub struct WindowCalculator<Tz: TimeZone> {
    tz: Tz,
}

impl<Tz: TimeZone> WindowCalculator<Tz> {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn zone(&self) -> &Tz {
        &self.tz
    }

    /// Display slot for a photo uploaded at `upload`.
    ///
    /// Afternoon uploads (local hour >= 12) go to tomorrow morning. Morning
    /// uploads go to today's slot unless that slot has already ended.
    pub fn compute_display_window(&self, upload: DateTime<Utc>) -> TimeWindow {
        let (date, hour) = self.local_date_hour(upload);
        if hour >= CYCLE_HOUR {
            return self.display_slot(next_day(date));
        }
        let today = self.display_slot(date);
        if today.end <= upload {
            self.display_slot(next_day(date))
        } else {
            today
        }
    }

    /// Historical upload window: 12:00 -> 06:00 next morning, anchored on the
    /// cycle containing `reference`.
    pub fn compute_upload_window(&self, reference: DateTime<Utc>) -> TimeWindow {
        let (date, hour) = self.local_date_hour(reference);
        let cycle_date = if hour < CYCLE_HOUR { prev_day(date) } else { date };
        TimeWindow {
            start: self.local_instant(cycle_date, CYCLE_HOUR),
            end: self.local_instant(next_day(cycle_date), UPLOAD_CLOSE_HOUR),
        }
    }

    /// The full noon-to-noon cycle containing `reference`
    pub fn current_upload_cycle(&self, reference: DateTime<Utc>) -> TimeWindow {
        let (date, hour) = self.local_date_hour(reference);
        let cycle_date = if hour < CYCLE_HOUR { prev_day(date) } else { date };
        TimeWindow {
            start: self.local_instant(cycle_date, CYCLE_HOUR),
            end: self.local_instant(next_day(cycle_date), CYCLE_HOUR),
        }
    }

    /// Today's 12:00 while it is still ahead, otherwise tomorrow's
    pub fn next_upload_window_start(&self, reference: DateTime<Utc>) -> DateTime<Utc> {
        let (date, hour) = self.local_date_hour(reference);
        if hour < CYCLE_HOUR {
            self.local_instant(date, CYCLE_HOUR)
        } else {
            self.local_instant(next_day(date), CYCLE_HOUR)
        }
    }

    pub fn is_in_upload_window(&self, reference: DateTime<Utc>) -> bool {
        self.compute_upload_window(reference).contains(reference)
    }

    /// Time left in the upload window, zero when outside of it
    pub fn remaining_upload_window(&self, reference: DateTime<Utc>) -> Duration {
        let window = self.compute_upload_window(reference);
        if window.contains(reference) {
            window.end - reference
        } else {
            Duration::zero()
        }
    }

    /// Whether the local wall clock reads inside 06:00..12:00
    pub fn is_display_hour(&self, reference: DateTime<Utc>) -> bool {
        let (_, hour) = self.local_date_hour(reference);
        (DISPLAY_START_HOUR..DISPLAY_END_HOUR).contains(&hour)
    }

    /// Calendar date of `instant` in this zone
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.local_date_hour(instant).0
    }

    fn display_slot(&self, date: NaiveDate) -> TimeWindow {
        TimeWindow {
            start: self.local_instant(date, DISPLAY_START_HOUR),
            end: self.local_instant(date, DISPLAY_END_HOUR),
        }
    }

    fn local_date_hour(&self, instant: DateTime<Utc>) -> (NaiveDate, u32) {
        let local = instant.with_timezone(&self.tz).naive_local();
        (local.date(), local.hour())
    }

    /// `hour:00` on `date` in this zone. A wall time skipped by a DST jump
    /// resolves to the first representable hour after it; a repeated one
    /// takes its earliest occurrence.
    fn local_instant(&self, date: NaiveDate, hour: u32) -> DateTime<Utc> {
        let naive: NaiveDateTime = date.and_time(NaiveTime::MIN) + Duration::hours(i64::from(hour));
        (0..3)
            .find_map(|shift| {
                self.tz
                    .from_local_datetime(&(naive + Duration::hours(shift)))
                    .earliest()
            })
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
    }
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(date)
}

fn prev_day(date: NaiveDate) -> NaiveDate {
    date.pred_opt().unwrap_or(date)
}

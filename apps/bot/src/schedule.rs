use std::{collections::HashSet, fmt, str::FromStr};

use anyhow::{Context as _, Error, bail, ensure};
use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

/// A daily broadcast time, wall clock in the schedule's zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot {
    pub hour: u32,
    pub minute: u32,
}

impl Slot {
    pub fn new(hour: u32, minute: u32) -> Result<Self, Error> {
        ensure!(hour < 24, "hour out of range: {hour}");
        ensure!(minute < 60, "minute out of range: {minute}");
        Ok(Self { hour, minute })
    }

    /// Six-field cron expression (with seconds) firing once a day at this slot.
    pub fn cron(&self) -> String {
        format!("0 {} {} * * *", self.minute, self.hour)
    }
}

impl FromStr for Slot {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((h, m)) = s.trim().split_once(':') else {
            bail!("expected HH:MM, got {s:?}");
        };
        let hour = h.trim().parse::<u32>().with_context(|| format!("bad hour in {s:?}"))?;
        let minute = m.trim().parse::<u32>().with_context(|| format!("bad minute in {s:?}"))?;
        Slot::new(hour, minute)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[derive(Debug, Clone)]
pub struct Schedule {
    slots: Vec<Slot>,
    tz: Tz,
}

impl Schedule {
    pub fn new(mut slots: Vec<Slot>, tz: Tz) -> Result<Self, Error> {
        ensure!(!slots.is_empty(), "schedule has no slots");
        slots.sort();
        slots.dedup();
        Ok(Self { slots, tz })
    }

    /// `times` is a comma-separated `HH:MM` list, `tz` an IANA zone name.
    pub fn parse(times: &str, tz: &str) -> Result<Self, Error> {
        let slots = times
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<Slot>, _>>()?;
        let tz = tz
            .trim()
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("unknown time zone {tz:?}: {e}"))?;
        Self::new(slots, tz)
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn local_now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }

    /// The first slot strictly after `now`. Slots that fall into a DST gap
    /// on a given day are skipped for that day.
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<(Slot, DateTime<Tz>)> {
        let local = now.with_timezone(&self.tz);
        let today = local.date_naive();

        (0..=2u64)
            .filter_map(|d| today.checked_add_days(Days::new(d)))
            .flat_map(|day| self.slots.iter().map(move |slot| (day, *slot)))
            .filter_map(|(day, slot)| {
                let naive = day.and_hms_opt(slot.hour, slot.minute, 0)?;
                let at = self.tz.from_local_datetime(&naive).earliest()?;
                Some((slot, at))
            })
            .find(|(_, at)| *at > local)
    }
}

/// Slots already broadcast on the current calendar day.
#[derive(Debug, Default)]
pub struct FiredSlots {
    day: Option<NaiveDate>,
    fired: HashSet<Slot>,
}

impl FiredSlots {
    /// Returns true the first time `slot` is claimed on `day`. Moving to a
    /// new day forgets everything fired before.
    pub fn claim(&mut self, day: NaiveDate, slot: Slot) -> bool {
        if self.day != Some(day) {
            self.fired.clear();
            self.day = Some(day);
        }
        self.fired.insert(slot)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Account linked to exactly one third-party identity.
///
/// Fields are private: a user is created once and never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: String,
    name: String,
    external_id: String,
}

impl User {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        external_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            external_id: external_id.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity at the external provider used to log in.
    pub fn external_id(&self) -> &str {
        &self.external_id
    }
}

/// Three-bucket tally attached to every activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Counters {
    pub small: i64,
    pub medium: i64,
    pub large: i64,
}

impl Counters {
    pub const ZERO: Counters = Counters {
        small: 0,
        medium: 0,
        large: 0,
    };

    pub fn new(small: i64, medium: i64, large: i64) -> Self {
        Self { small, medium, large }
    }

    /// Sum of the three buckets, saturating at the `i64` bounds.
    pub fn total(&self) -> i64 {
        self.small
            .saturating_add(self.medium)
            .saturating_add(self.large)
    }

    /// Component-wise sum, or `None` if any bucket overflows.
    pub fn checked_add(self, rhs: Counters) -> Option<Counters> {
        Some(Counters {
            small: self.small.checked_add(rhs.small)?,
            medium: self.medium.checked_add(rhs.medium)?,
            large: self.large.checked_add(rhs.large)?,
        })
    }
}

/// Saturating. Use [`Counters::checked_add`] to detect overflow.
impl Add for Counters {
    type Output = Counters;

    fn add(self, rhs: Counters) -> Counters {
        Counters {
            small: self.small.saturating_add(rhs.small),
            medium: self.medium.saturating_add(rhs.medium),
            large: self.large.saturating_add(rhs.large),
        }
    }
}

impl AddAssign for Counters {
    fn add_assign(&mut self, rhs: Counters) {
        *self = *self + rhs;
    }
}

/// One recorded action of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    user_id: String,
    time_utc: DateTime<Utc>,
    counters: Counters,
}

impl Activity {
    pub fn new(user_id: impl Into<String>, time_utc: DateTime<Utc>, counters: Counters) -> Self {
        Self {
            user_id: user_id.into(),
            time_utc,
            counters,
        }
    }

    /// Owning user. Not checked against any user store.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn time_utc(&self) -> DateTime<Utc> {
        self.time_utc
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Whole-second Unix timestamp; sub-second precision is dropped.
    pub fn unix_second(&self) -> i64 {
        self.time_utc.timestamp()
    }

    /// Copy of this activity moved to the start of `second`.
    pub(crate) fn at_second(&self, second: i64) -> Option<Activity> {
        let time_utc = DateTime::from_timestamp(second, 0)?;
        Some(Activity::new(self.user_id.clone(), time_utc, self.counters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_counters_add() {
        let sum = Counters::new(1, 2, 3) + Counters::new(10, 20, 30);
        assert_eq!(sum, Counters::new(11, 22, 33));
        assert_eq!(sum.total(), 66);

        let mut acc = Counters::default();
        acc += Counters::new(1, 2, 3);
        assert_eq!(acc, Counters::new(1, 2, 3));
        assert_eq!(acc + Counters::ZERO, acc);
    }

    #[test]
    fn test_counters_overflow() {
        let full = Counters::new(i64::MAX, 0, 0);
        let one = Counters::new(1, 0, 0);
        assert_eq!(full.checked_add(one), None);
        assert_eq!(
            full.checked_add(Counters::new(0, 1, 1)),
            Some(Counters::new(i64::MAX, 1, 1))
        );
        assert_eq!(full + one, full);
        assert_eq!(Counters::new(i64::MAX, i64::MAX, 0).total(), i64::MAX);
        assert_eq!(Counters::new(i64::MIN, -1, 0).total(), i64::MIN);
    }

    #[test]
    fn test_activity_second_truncates_subsecond() {
        let time = Utc
            .with_ymd_and_hms(2020, 8, 2, 10, 10, 10)
            .unwrap()
            .with_nanosecond(10)
            .unwrap();
        let activity = Activity::new("123", time, Counters::new(3, 3, 0));
        assert_eq!(activity.unix_second(), 1_596_363_010);

        let moved = activity.at_second(activity.unix_second() + 1).unwrap();
        assert_eq!(moved.user_id(), "123");
        assert_eq!(moved.counters(), Counters::new(3, 3, 0));
        assert_eq!(
            moved.time_utc(),
            Utc.with_ymd_and_hms(2020, 8, 2, 10, 10, 11).unwrap()
        );
    }

    #[test]
    fn test_user_json_layout() {
        let user = User::new("123", "alice", "12345678");
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "123", "name": "alice", "external_id": "12345678"})
        );
    }
}

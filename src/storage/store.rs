use crate::core::{Activity, Result, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Predicate deciding which activities a query returns.
pub type ActivityFilter<'a> = &'a (dyn Fn(&Activity) -> bool + Send + Sync);

/// User persistence backend.
///
/// Every read hands out an independent copy; mutating it never touches
/// stored state.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Exact lookup by primary id.
    async fn get(&self, user_id: &str) -> Result<User>;

    /// Lookup by the linked third-party identity.
    async fn get_by_external_id(&self, external_id: &str) -> Result<User>;

    /// Fails with `UserAlreadyExists` if either the id or the external id is
    /// already taken.
    async fn add(&self, user: &User) -> Result<()>;

    async fn count(&self) -> usize;

    /// Flushes everything to the medium. Call once, at the end.
    async fn close(&self) -> Result<()>;
}

/// Activity persistence backend.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Stores a copy of `activity` and returns it as stored.
    ///
    /// The owning user is not validated. If the user already has an activity
    /// in the same second the copy is moved to the next free second.
    async fn add(&self, activity: &Activity) -> Result<Activity>;

    /// All activities of `user_id` accepted by `filter`, oldest first.
    /// Unknown users simply have no activities.
    async fn query(&self, user_id: &str, filter: ActivityFilter<'_>) -> Result<Vec<Activity>>;

    async fn close(&self) -> Result<()>;
}

/// Filter keeping activities strictly between `after` and `before`.
///
/// Both bounds are exclusive: an activity exactly on either instant is
/// dropped.
pub fn time_window(
    after: DateTime<Utc>,
    before: DateTime<Utc>,
) -> impl Fn(&Activity) -> bool + Send + Sync {
    move |activity| {
        let time = activity.time_utc();
        after < time && time < before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Counters;
    use chrono::TimeZone;

    #[test]
    fn test_time_window_excludes_both_bounds() {
        let begin = Utc.with_ymd_and_hms(2020, 8, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2020, 9, 1, 0, 0, 0).unwrap();
        let window = time_window(begin, end);

        let at = |time| Activity::new("123", time, Counters::new(1, 0, 0));
        assert!(!window(&at(begin)));
        assert!(!window(&at(end)));
        assert!(window(&at(Utc.with_ymd_and_hms(2020, 8, 1, 0, 0, 1).unwrap())));
        assert!(window(&at(Utc.with_ymd_and_hms(2020, 8, 31, 23, 59, 59).unwrap())));
        assert!(!window(&at(Utc.with_ymd_and_hms(2020, 7, 31, 23, 59, 59).unwrap())));
    }
}

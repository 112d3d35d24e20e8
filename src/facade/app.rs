use crate::config::{StoreConfig, StoreLocation};
use crate::core::{Activity, Clock, Counters, GokiError, Result, SystemClock, User, aggregate};
use crate::storage::{
    ActivityStore, FileActivityStore, FileMedium, FileUserStore, RemoteActivityStore,
    RemoteUserStore, UserStore, time_window,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Application entry point for the web layer: users, activities, and
/// per-period totals.
pub struct App {
    users: Arc<dyn UserStore>,
    activities: Arc<dyn ActivityStore>,
    clock: Arc<dyn Clock>,
}

impl App {
    pub fn new(users: Arc<dyn UserStore>, activities: Arc<dyn ActivityStore>) -> Self {
        Self {
            users,
            activities,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Opens both stores described by `config`.
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        let client = config.http_client()?;

        let users: Arc<dyn UserStore> = match (&config.users, &client) {
            (StoreLocation::File(path), _) => {
                Arc::new(FileUserStore::open(FileMedium::new(path)).await?)
            }
            (StoreLocation::Remote { base_url, object }, Some(client)) => {
                let medium = config.http_medium(client, base_url, object);
                Arc::new(RemoteUserStore::open(medium).await?)
            }
            (StoreLocation::Remote { .. }, None) => return Err(missing_client()),
        };
        let activities: Arc<dyn ActivityStore> = match (&config.activities, &client) {
            (StoreLocation::File(path), _) => {
                Arc::new(FileActivityStore::open(FileMedium::new(path)).await?)
            }
            (StoreLocation::Remote { base_url, object }, Some(client)) => {
                let medium = config.http_medium(client, base_url, object);
                Arc::new(RemoteActivityStore::open(medium).await?)
            }
            (StoreLocation::Remote { .. }, None) => return Err(missing_client()),
        };

        info!(users = %config.users, activities = %config.activities, "app opened");
        Ok(Self::new(users, activities))
    }

    /// Fresh random id for a user created on first login.
    pub fn new_user_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub async fn add_user(&self, user_id: &str, name: &str, external_id: &str) -> Result<User> {
        let user = User::new(user_id, name, external_id);
        self.users.add(&user).await?;
        info!(user_id, "user registered");
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User> {
        self.users.get(user_id).await
    }

    pub async fn get_user_by_external_id(&self, external_id: &str) -> Result<User> {
        self.users.get_by_external_id(external_id).await
    }

    /// Records an activity stamped with the current time.
    pub async fn record_activity(
        &self,
        user_id: &str,
        small: i64,
        medium: i64,
        large: i64,
    ) -> Result<Activity> {
        let now = self.clock.now();
        self.record_activity_at(user_id, now, Counters::new(small, medium, large))
            .await
    }

    /// Records an activity at `at`. The stored instant may be later if the
    /// user already has an activity in that second.
    pub async fn record_activity_at(
        &self,
        user_id: &str,
        at: DateTime<Utc>,
        counters: Counters,
    ) -> Result<Activity> {
        self.users.get(user_id).await?;
        self.activities
            .add(&Activity::new(user_id, at, counters))
            .await
    }

    /// Totals for the calendar year `year` in UTC.
    pub async fn count_by_year(&self, user_id: &str, year: i32) -> Result<Counters> {
        self.count_by_year_in(user_id, year, &Utc).await
    }

    pub async fn count_by_year_in<Tz>(&self, user_id: &str, year: i32, tz: &Tz) -> Result<Counters>
    where
        Tz: TimeZone + Sync,
    {
        let (begin, end) = year_window(tz, year)?;
        self.count(user_id, begin, end).await
    }

    /// Totals for `month` (1-12) of `year` in UTC.
    pub async fn count_by_month(&self, user_id: &str, year: i32, month: u32) -> Result<Counters> {
        self.count_by_month_in(user_id, year, month, &Utc).await
    }

    pub async fn count_by_month_in<Tz>(
        &self,
        user_id: &str,
        year: i32,
        month: u32,
        tz: &Tz,
    ) -> Result<Counters>
    where
        Tz: TimeZone + Sync,
    {
        let (begin, end) = month_window(tz, year, month)?;
        self.count(user_id, begin, end).await
    }

    async fn count(
        &self,
        user_id: &str,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Counters> {
        let window = time_window(begin, end);
        let matched = self.activities.query(user_id, &window).await?;
        debug!(user_id, %begin, %end, matched = matched.len(), "counted activities");
        aggregate(&matched)
    }

    /// Closes both stores. Both are always attempted.
    pub async fn shutdown(&self) -> Result<()> {
        let activities = self.activities.close().await.err().map(Box::new);
        let users = self.users.close().await.err().map(Box::new);

        if users.is_none() && activities.is_none() {
            info!("app shut down");
            return Ok(());
        }
        Err(GokiError::Shutdown { users, activities })
    }
}

fn missing_client() -> GokiError {
    GokiError::Config("remote store configured without an HTTP client".to_string())
}

/// Local midnight at the start of `year`-`month`-01 in `tz`, as UTC.
fn month_start<Tz: TimeZone>(tz: &Tz, year: i32, month: u32) -> Result<DateTime<Utc>> {
    let midnight = NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| GokiError::InvalidPeriod(format!("{}-{:02}", year, month)))?;
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| {
            GokiError::InvalidPeriod(format!(
                "midnight of {}-{:02}-01 does not exist locally",
                year, month
            ))
        })
}

pub(crate) fn year_window<Tz: TimeZone>(
    tz: &Tz,
    year: i32,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let next = year
        .checked_add(1)
        .ok_or_else(|| GokiError::InvalidPeriod(format!("year {}", year)))?;
    Ok((month_start(tz, year, 1)?, month_start(tz, next, 1)?))
}

pub(crate) fn month_window<Tz: TimeZone>(
    tz: &Tz,
    year: i32,
    month: u32,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    if !(1..=12).contains(&month) {
        return Err(GokiError::InvalidPeriod(format!("month {}", month)));
    }
    let (next_year, next_month) = if month == 12 {
        let next = year
            .checked_add(1)
            .ok_or_else(|| GokiError::InvalidPeriod(format!("year {}", year)))?;
        (next, 1)
    } else {
        (year, month + 1)
    };
    Ok((month_start(tz, year, month)?, month_start(tz, next_year, next_month)?))
}

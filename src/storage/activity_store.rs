use super::document::Document;
use super::http::HttpMedium;
use super::medium::{FileMedium, Medium};
use super::store::{ActivityFilter, ActivityStore};
use crate::core::{Activity, GokiError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Upper bound on seconds probed for a free slot: one day.
///
/// A single user would need to log more than 86 400 activities within a day
/// of each other to reach it.
pub const MAX_COLLISION_PROBES: i64 = 86_400;

/// `user_id -> unix_second -> Activity`.
type ActivityMap = HashMap<String, BTreeMap<i64, Activity>>;

/// Activities kept in one JSON document on a [`Medium`], keyed by user and
/// whole second.
#[derive(Debug)]
pub struct JsonActivityStore<M> {
    document: Document<M, ActivityMap>,
}

pub type FileActivityStore = JsonActivityStore<FileMedium>;
pub type RemoteActivityStore = JsonActivityStore<HttpMedium>;

impl<M: Medium> JsonActivityStore<M> {
    pub async fn open(medium: M) -> Result<Self> {
        Ok(Self {
            document: Document::open("activity", medium).await?,
        })
    }
}

/// First second at or after `requested` with no activity.
fn free_second(taken: &BTreeMap<i64, Activity>, requested: i64) -> Result<i64> {
    (0..MAX_COLLISION_PROBES)
        .filter_map(|offset| requested.checked_add(offset))
        .find(|second| !taken.contains_key(second))
        .ok_or_else(|| {
            GokiError::Internal(format!(
                "no free second within {} of {}",
                MAX_COLLISION_PROBES, requested
            ))
        })
}

#[async_trait]
impl<M: Medium> ActivityStore for JsonActivityStore<M> {
    async fn add(&self, activity: &Activity) -> Result<Activity> {
        let requested = activity.unix_second();
        let stored = self
            .document
            .update(|by_user| {
                let second = match by_user.get(activity.user_id()) {
                    Some(seconds) => free_second(seconds, requested)?,
                    None => requested,
                };
                let stored = activity.at_second(second).ok_or_else(|| {
                    GokiError::Internal(format!("second {} is out of range", second))
                })?;
                by_user
                    .entry(activity.user_id().to_string())
                    .or_default()
                    .insert(second, stored.clone());
                Ok(stored)
            })
            .await?;

        let shifted = stored.unix_second() - requested;
        if shifted > 0 {
            debug!(
                user_id = %stored.user_id(),
                requested,
                shifted,
                "activity moved to next free second"
            );
        }
        debug!(user_id = %stored.user_id(), second = stored.unix_second(), "activity added");
        Ok(stored)
    }

    async fn query(&self, user_id: &str, filter: ActivityFilter<'_>) -> Result<Vec<Activity>> {
        // Activities own all their data and expose no mutators, so clones
        // handed out here cannot reach the stored values.
        let activities = self
            .document
            .read(|by_user| match by_user.get(user_id) {
                Some(seconds) => seconds
                    .values()
                    .filter(|activity| filter(activity))
                    .cloned()
                    .collect(),
                None => Vec::new(),
            })
            .await;
        Ok(activities)
    }

    async fn close(&self) -> Result<()> {
        self.document.close().await
    }
}

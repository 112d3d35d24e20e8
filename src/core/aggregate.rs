//! Component-wise summation of activity counters.

use super::error::{GokiError, Result};
use super::types::{Activity, Counters};
use std::iter::Sum;

/// Saturating, like `Add`. [`aggregate`] reports overflow instead.
impl Sum for Counters {
    fn sum<I: Iterator<Item = Counters>>(iter: I) -> Counters {
        iter.fold(Counters::ZERO, |acc, counters| acc + counters)
    }
}

impl<'a> Sum<&'a Counters> for Counters {
    fn sum<I: Iterator<Item = &'a Counters>>(iter: I) -> Counters {
        iter.copied().sum()
    }
}

/// Sum of the counters of every activity; zero activities yield [`Counters::ZERO`].
///
/// Fails with `CounterOverflow` if any bucket exceeds the `i64` range.
pub fn aggregate<'a, I>(activities: I) -> Result<Counters>
where
    I: IntoIterator<Item = &'a Activity>,
{
    activities
        .into_iter()
        .try_fold(Counters::ZERO, |acc, activity| {
            acc.checked_add(activity.counters()).ok_or_else(|| {
                GokiError::CounterOverflow(format!(
                    "totals for user '{}' exceed the counter range",
                    activity.user_id()
                ))
            })
        })
}

mod ballot;
mod config;
mod election;
mod vote;

pub mod builder;
pub mod manual;
pub mod quick_start;

use chrono::{DateTime, Utc};

pub use crate::ballot::*;
pub use crate::config::*;
pub use crate::election::*;
pub use crate::vote::*;

/// Splits the yeas and the nays into percentages.
///
/// Empty and invalid ballots are not part of the base. If nobody voted yes
/// or no, the result is `(0.0, 100.0)`: such a ballot counts as rejected.
///
/// ```
/// use ballot_results::percentage;
///
/// assert_eq!(percentage(1, 3), (25.0, 75.0));
/// assert_eq!(percentage(0, 0), (0.0, 100.0));
/// ```
pub fn percentage(yeas: u64, nays: u64) -> (f64, f64) {
    let total = yeas.saturating_add(nays);
    if total == 0 {
        return (0.0, 100.0);
    }
    let yeas_percentage = 100.0 * yeas as f64 / total as f64;
    (yeas_percentage, 100.0 - yeas_percentage)
}

/// Decides if results may be shown as complete.
///
/// An explicit status from the uploader wins over the counting progress:
/// final results are complete even if some entities are missing, interim
/// results never are. Without a status (or an unknown one), the results are
/// complete once everything is counted.
pub fn completed(status: Option<Status>, counted: bool) -> bool {
    match status {
        Some(Status::Final) => true,
        Some(Status::Interim) => false,
        Some(Status::Unknown) | None => counted,
    }
}

/// (counted, total) over a sequence of counted flags.
pub(crate) fn progress<I: IntoIterator<Item = bool>>(flags: I) -> (usize, usize) {
    flags
        .into_iter()
        .fold((0, 0), |(c, t), counted| (c + counted as usize, t + 1))
}

/// Sums tallies, stopping at `u64::MAX` instead of overflowing.
pub(crate) fn saturating_sum<I: IntoIterator<Item = u64>>(values: I) -> u64 {
    values.into_iter().fold(0, u64::saturating_add)
}

pub(crate) fn latest<I>(changes: I) -> Option<DateTime<Utc>>
where
    I: IntoIterator<Item = Option<DateTime<Utc>>>,
{
    changes.into_iter().flatten().max()
}

pub(crate) fn turnout(cast_ballots: u64, eligible_voters: u64) -> f64 {
    if eligible_voters == 0 {
        0.0
    } else {
        cast_ballots as f64 / eligible_voters as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn percentage_splits_yeas_and_nays() {
        let (yeas, nays) = percentage(816, 97);
        assert!((yeas - 89.37568).abs() < 1e-4);
        assert!((nays - 10.62431).abs() < 1e-4);
        assert_eq!(yeas + nays, 100.0);
    }

    #[test]
    fn percentage_without_votes_is_rejected() {
        assert_eq!(percentage(0, 0), (0.0, 100.0));
        assert_eq!(percentage(0, 5), (0.0, 100.0));
        assert_eq!(percentage(5, 0), (100.0, 0.0));
    }

    #[test]
    fn completed_truth_table() {
        assert!(completed(Some(Status::Final), false));
        assert!(completed(Some(Status::Final), true));
        assert!(!completed(Some(Status::Interim), false));
        assert!(!completed(Some(Status::Interim), true));
        assert!(!completed(Some(Status::Unknown), false));
        assert!(completed(Some(Status::Unknown), true));
        assert!(!completed(None, false));
        assert!(completed(None, true));
    }

    #[test]
    fn progress_counts_flags() {
        assert_eq!(progress(vec![]), (0, 0));
        assert_eq!(progress(vec![true, false, true]), (2, 3));
    }

    #[test]
    fn sums_saturate() {
        assert_eq!(saturating_sum(vec![]), 0);
        assert_eq!(saturating_sum(vec![1, 2, 3]), 6);
        assert_eq!(saturating_sum(vec![u64::MAX, 1, 5]), u64::MAX);
        assert_eq!(percentage(u64::MAX, 1), (100.0, 0.0));
    }

    #[test]
    fn latest_ignores_missing() {
        let a = Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2003, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(latest(vec![None, None]), None);
        assert_eq!(latest(vec![Some(b), None, Some(a)]), Some(b));
    }

    #[test]
    fn turnout_without_eligible_voters() {
        assert_eq!(turnout(10, 0), 0.0);
        assert_eq!(turnout(50, 200), 25.0);
    }
}

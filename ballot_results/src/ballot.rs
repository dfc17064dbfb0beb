use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use log::debug;

use crate::config::*;
use crate::{percentage, progress, saturating_sum, turnout};

impl BallotResult {
    /// A result that has not been counted yet.
    pub fn new(entity_id: u32, name: &str) -> BallotResult {
        BallotResult {
            entity_id,
            name: name.to_string(),
            ..BallotResult::default()
        }
    }

    pub fn cast_ballots(&self) -> u64 {
        saturating_sum([self.yeas, self.nays, self.empty, self.invalid])
    }

    pub fn yeas_percentage(&self) -> f64 {
        percentage(self.yeas, self.nays).0
    }

    pub fn nays_percentage(&self) -> f64 {
        percentage(self.yeas, self.nays).1
    }

    /// `None` until the result is counted. Ties are rejected.
    pub fn accepted(&self) -> Option<bool> {
        if self.counted {
            Some(self.yeas > self.nays)
        } else {
            None
        }
    }

    pub fn turnout(&self) -> f64 {
        turnout(self.cast_ballots(), self.eligible_voters)
    }
}

/// One question of a vote, with the results of all the entities.
///
/// All the aggregated values are computed on every call.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Ballot {
    pub(crate) ballot_type: BallotType,
    pub(crate) title: Option<String>,
    pub(crate) results: Vec<BallotResult>,
    pub(crate) last_change: Option<DateTime<Utc>>,
}

impl Ballot {
    pub fn new(ballot_type: BallotType) -> Ballot {
        Ballot {
            ballot_type,
            title: None,
            results: Vec::new(),
            last_change: None,
        }
    }

    pub fn with_results(
        ballot_type: BallotType,
        results: Vec<BallotResult>,
    ) -> Result<Ballot, VoteError> {
        let mut ballot = Ballot::new(ballot_type);
        ballot.replace_results(results)?;
        Ok(ballot)
    }

    pub fn ballot_type(&self) -> BallotType {
        self.ballot_type
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn results(&self) -> &[BallotResult] {
        &self.results
    }

    pub fn result(&self, entity_id: u32) -> Option<&BallotResult> {
        self.results.iter().find(|r| r.entity_id == entity_id)
    }

    /// The last time the ballot itself (not its results) changed.
    pub fn last_change(&self) -> Option<DateTime<Utc>> {
        self.last_change
    }

    pub(crate) fn set_title(&mut self, title: Option<String>, at: DateTime<Utc>) {
        self.title = title;
        self.last_change = Some(at);
    }

    /// Adds the result of an entity. Each entity reports at most once.
    pub fn add_result(&mut self, result: BallotResult) -> Result<(), VoteError> {
        if self.result(result.entity_id).is_some() {
            return Err(VoteError::DuplicateEntity(result.entity_id));
        }
        debug!(
            "add_result: {}: entity {} counted: {}",
            self.ballot_type, result.entity_id, result.counted
        );
        self.results.push(result);
        Ok(())
    }

    pub fn update_result<F>(&mut self, entity_id: u32, update: F) -> Result<(), VoteError>
    where
        F: FnOnce(&mut BallotResult),
    {
        let result = self
            .results
            .iter_mut()
            .find(|r| r.entity_id == entity_id)
            .ok_or(VoteError::UnknownEntity(entity_id))?;
        update(result);
        // The closure may not change the identity of the result.
        result.entity_id = entity_id;
        Ok(())
    }

    pub fn remove_result(&mut self, entity_id: u32) -> Result<BallotResult, VoteError> {
        let idx = self
            .results
            .iter()
            .position(|r| r.entity_id == entity_id)
            .ok_or(VoteError::UnknownEntity(entity_id))?;
        Ok(self.results.remove(idx))
    }

    /// Replaces all the results at once. Nothing changes if the new results
    /// contain the same entity twice.
    pub fn replace_results(&mut self, results: Vec<BallotResult>) -> Result<(), VoteError> {
        let mut seen: BTreeSet<u32> = BTreeSet::new();
        for r in results.iter() {
            if !seen.insert(r.entity_id) {
                return Err(VoteError::DuplicateEntity(r.entity_id));
            }
        }
        self.results = results;
        Ok(())
    }

    pub fn clear_results(&mut self) {
        self.results.clear();
    }

    pub fn has_results(&self) -> bool {
        !self.results.is_empty()
    }

    fn sum<F: Fn(&BallotResult) -> u64>(&self, f: F) -> u64 {
        saturating_sum(self.results.iter().map(f))
    }

    // The sums include the results that are not counted yet.

    pub fn yeas(&self) -> u64 {
        self.sum(|r| r.yeas)
    }

    pub fn nays(&self) -> u64 {
        self.sum(|r| r.nays)
    }

    pub fn empty(&self) -> u64 {
        self.sum(|r| r.empty)
    }

    pub fn invalid(&self) -> u64 {
        self.sum(|r| r.invalid)
    }

    pub fn eligible_voters(&self) -> u64 {
        self.sum(|r| r.eligible_voters)
    }

    pub fn expats(&self) -> u64 {
        self.sum(|r| r.expats)
    }

    pub fn cast_ballots(&self) -> u64 {
        self.sum(|r| r.cast_ballots())
    }

    /// True once every entity is counted. A ballot without any result is
    /// not counted.
    pub fn counted(&self) -> bool {
        !self.results.is_empty() && self.results.iter().all(|r| r.counted)
    }

    /// `None` until the ballot is counted. Ties are rejected.
    pub fn accepted(&self) -> Option<bool> {
        if self.counted() {
            Some(self.yeas() > self.nays())
        } else {
            None
        }
    }

    /// (counted entities, total entities)
    pub fn progress(&self) -> (usize, usize) {
        progress(self.results.iter().map(|r| r.counted))
    }

    pub fn turnout(&self) -> f64 {
        turnout(self.cast_ballots(), self.eligible_voters())
    }

    pub fn yeas_percentage(&self) -> f64 {
        percentage(self.yeas(), self.nays()).0
    }

    pub fn nays_percentage(&self) -> f64 {
        percentage(self.yeas(), self.nays()).1
    }

    /// The sorted names of the counted entities.
    pub fn counted_entities(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self
            .results
            .iter()
            .filter(|r| r.counted && !r.name.is_empty())
            .map(|r| r.name.as_str())
            .collect();
        names.into_iter().map(|s| s.to_string()).collect()
    }

    pub fn percentage_by_entity(&self) -> BTreeMap<u32, EntityPercentage> {
        self.results
            .iter()
            .map(|r| {
                let (yeas, nays) = if r.counted {
                    (Some(r.yeas_percentage()), Some(r.nays_percentage()))
                } else {
                    (None, None)
                };
                (
                    r.entity_id,
                    EntityPercentage {
                        counted: r.counted,
                        yeas_percentage: yeas,
                        nays_percentage: nays,
                    },
                )
            })
            .collect()
    }

    /// The results grouped by district, sorted by district name. The
    /// results without a district come last.
    pub fn results_by_district(&self) -> Vec<DistrictResult> {
        let mut groups: BTreeMap<Option<&str>, Vec<&BallotResult>> = BTreeMap::new();
        for r in self.results.iter() {
            groups.entry(r.district.as_deref()).or_default().push(r);
        }
        let mut res: Vec<DistrictResult> = groups
            .into_iter()
            .map(|(district, results)| {
                let counted = results.iter().all(|r| r.counted);
                let yeas = saturating_sum(results.iter().map(|r| r.yeas));
                let nays = saturating_sum(results.iter().map(|r| r.nays));
                let (yeas_percentage, nays_percentage) = percentage(yeas, nays);
                let mut entity_ids: Vec<u32> = results.iter().map(|r| r.entity_id).collect();
                entity_ids.sort_unstable();
                DistrictResult {
                    district: district.map(|s| s.to_string()),
                    counted,
                    accepted: if counted { Some(yeas > nays) } else { None },
                    yeas,
                    nays,
                    yeas_percentage,
                    nays_percentage,
                    empty: saturating_sum(results.iter().map(|r| r.empty)),
                    invalid: saturating_sum(results.iter().map(|r| r.invalid)),
                    eligible_voters: saturating_sum(results.iter().map(|r| r.eligible_voters)),
                    entity_ids,
                }
            })
            .collect();
        // None sorts first in the map.
        if res.first().map(|d| d.district.is_none()).unwrap_or(false) {
            let no_district = res.remove(0);
            res.push(no_district);
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(entity_id: u32, counted: bool, yeas: u64, nays: u64) -> BallotResult {
        BallotResult {
            entity_id,
            name: format!("entity-{}", entity_id),
            counted,
            yeas,
            nays,
            ..BallotResult::default()
        }
    }

    #[test]
    fn result_percentages_without_votes() {
        let r = BallotResult {
            invalid: 100,
            empty: 100,
            ..BallotResult::new(1, "x")
        };
        assert_eq!(r.yeas_percentage(), 0.0);
        assert_eq!(r.nays_percentage(), 100.0);
        assert_eq!(r.cast_ballots(), 200);
    }

    #[test]
    fn huge_tallies_do_not_overflow() {
        let mut ballot = Ballot::new(BallotType::Proposal);
        ballot.add_result(result(1, true, u64::MAX, 1)).unwrap();
        ballot.add_result(result(2, true, 10, 0)).unwrap();
        assert_eq!(ballot.results()[0].cast_ballots(), u64::MAX);
        assert_eq!(ballot.yeas(), u64::MAX);
        assert_eq!(ballot.cast_ballots(), u64::MAX);
        assert_eq!(ballot.results_by_district()[0].yeas, u64::MAX);
    }

    #[test]
    fn result_accepted_needs_counting() {
        let mut r = result(1, false, 10, 5);
        assert_eq!(r.accepted(), None);
        r.counted = true;
        assert_eq!(r.accepted(), Some(true));
        r.nays = 10;
        assert_eq!(r.accepted(), Some(false));
    }

    #[test]
    fn empty_ballot_is_not_counted() {
        let ballot = Ballot::new(BallotType::Proposal);
        assert!(!ballot.counted());
        assert_eq!(ballot.accepted(), None);
        assert_eq!(ballot.progress(), (0, 0));
        assert_eq!(ballot.yeas(), 0);
        assert_eq!(ballot.turnout(), 0.0);
        assert!(!ballot.has_results());
    }

    #[test]
    fn sums_ignore_counted_flag() {
        let mut ballot = Ballot::new(BallotType::Proposal);
        ballot
            .add_result(BallotResult {
                empty: 14,
                invalid: 5,
                eligible_voters: 1000,
                ..result(1, true, 309, 69)
            })
            .unwrap();
        ballot
            .add_result(BallotResult {
                empty: 5,
                invalid: 0,
                eligible_voters: 3132,
                expats: 18,
                ..result(2, true, 507, 28)
            })
            .unwrap();
        assert!(ballot.counted());
        assert_eq!(ballot.accepted(), Some(true));
        assert_eq!(ballot.yeas(), 816);
        assert_eq!(ballot.nays(), 97);
        assert_eq!(ballot.empty(), 19);
        assert_eq!(ballot.invalid(), 5);
        assert_eq!(ballot.eligible_voters(), 4132);
        assert_eq!(ballot.expats(), 18);
        assert_eq!(ballot.cast_ballots(), 937);
        assert_eq!(format!("{:.2}", ballot.yeas_percentage()), "89.38");
        assert_eq!(format!("{:.2}", ballot.nays_percentage()), "10.62");
        assert_eq!(format!("{:.2}", ballot.turnout()), "22.68");

        ballot.add_result(result(3, false, 0, 0)).unwrap();
        assert_eq!(ballot.yeas(), 816);
        assert_eq!(ballot.nays(), 97);
        assert_eq!(ballot.empty(), 19);
        assert_eq!(ballot.invalid(), 5);
        assert!(!ballot.counted());
        assert_eq!(ballot.accepted(), None);
        assert_eq!(ballot.progress(), (2, 3));

        ballot.update_result(3, |r| r.counted = true).unwrap();
        assert!(ballot.counted());
        assert_eq!(ballot.accepted(), Some(true));
        assert_eq!(ballot.progress(), (3, 3));
    }

    #[test]
    fn tie_is_rejected() {
        let ballot =
            Ballot::with_results(BallotType::Proposal, vec![result(1, true, 50, 50)]).unwrap();
        assert_eq!(ballot.accepted(), Some(false));
    }

    #[test]
    fn duplicate_entities_are_refused() {
        let mut ballot = Ballot::new(BallotType::Proposal);
        ballot.add_result(result(1, true, 1, 0)).unwrap();
        assert_eq!(
            ballot.add_result(result(1, true, 1, 0)),
            Err(VoteError::DuplicateEntity(1))
        );
        assert_eq!(
            Ballot::with_results(
                BallotType::Proposal,
                vec![result(2, true, 1, 0), result(2, false, 0, 0)]
            ),
            Err(VoteError::DuplicateEntity(2))
        );
    }

    #[test]
    fn update_and_remove_unknown_entity() {
        let mut ballot = Ballot::new(BallotType::Proposal);
        assert_eq!(
            ballot.update_result(7, |r| r.yeas = 1),
            Err(VoteError::UnknownEntity(7))
        );
        assert_eq!(ballot.remove_result(7), Err(VoteError::UnknownEntity(7)));
        ballot.add_result(result(7, true, 1, 2)).unwrap();
        let removed = ballot.remove_result(7).unwrap();
        assert_eq!(removed.nays, 2);
        assert!(!ballot.has_results());
    }

    #[test]
    fn counted_entities_are_sorted() {
        let mut ballot = Ballot::new(BallotType::Proposal);
        ballot
            .add_result(BallotResult {
                name: "Zug".to_string(),
                ..result(1711, true, 1, 0)
            })
            .unwrap();
        ballot
            .add_result(BallotResult {
                name: "Baar".to_string(),
                ..result(1701, true, 1, 0)
            })
            .unwrap();
        ballot
            .add_result(BallotResult {
                name: "Cham".to_string(),
                ..result(1702, false, 0, 0)
            })
            .unwrap();
        assert_eq!(ballot.counted_entities(), vec!["Baar", "Zug"]);
    }

    #[test]
    fn percentage_by_entity_hides_uncounted() {
        let ballot = Ballot::with_results(
            BallotType::Proposal,
            vec![result(1, true, 30, 10), result(2, false, 5, 5)],
        )
        .unwrap();
        let by_entity = ballot.percentage_by_entity();
        assert_eq!(
            by_entity[&1],
            EntityPercentage {
                counted: true,
                yeas_percentage: Some(75.0),
                nays_percentage: Some(25.0)
            }
        );
        assert_eq!(
            by_entity[&2],
            EntityPercentage {
                counted: false,
                yeas_percentage: None,
                nays_percentage: None
            }
        );
    }

    #[test]
    fn results_by_district() {
        let with_district = |r: BallotResult, d: Option<&str>| BallotResult {
            district: d.map(|s| s.to_string()),
            ..r
        };
        let ballot = Ballot::with_results(
            BallotType::Proposal,
            vec![
                with_district(result(3, true, 10, 0), None),
                with_district(result(2, true, 10, 30), Some("South")),
                with_district(result(1, true, 20, 10), Some("North")),
                with_district(result(4, false, 0, 0), Some("North")),
            ],
        )
        .unwrap();
        let rows = ballot.results_by_district();
        let names: Vec<Option<&str>> = rows.iter().map(|r| r.district.as_deref()).collect();
        assert_eq!(names, vec![Some("North"), Some("South"), None]);

        assert!(!rows[0].counted);
        assert_eq!(rows[0].accepted, None);
        assert_eq!(rows[0].entity_ids, vec![1, 4]);
        assert_eq!(rows[0].yeas, 20);

        assert!(rows[1].counted);
        assert_eq!(rows[1].accepted, Some(false));
        assert_eq!(rows[1].yeas_percentage, 25.0);

        assert_eq!(rows[2].accepted, Some(true));
        assert_eq!(rows[2].entity_ids, vec![3]);
    }
}

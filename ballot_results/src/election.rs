use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::*;
use crate::{completed, latest, progress, saturating_sum, turnout};

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub family_name: String,
    pub first_name: String,
    pub elected: bool,
    pub party: Option<String>,
}

/// The result of one entity in an election.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElectionResult {
    pub entity_id: u32,
    pub name: String,
    pub district: Option<String>,
    pub counted: bool,
    pub eligible_voters: u64,
    pub received_ballots: u64,
    pub blank_ballots: u64,
    pub invalid_ballots: u64,
    pub blank_votes: u64,
    pub invalid_votes: u64,
    /// Votes per candidate id.
    pub candidate_votes: BTreeMap<String, u64>,
}

impl ElectionResult {
    pub fn accounted_ballots(&self) -> u64 {
        self.received_ballots
            .saturating_sub(self.blank_ballots)
            .saturating_sub(self.invalid_ballots)
    }

    /// Every accounted ballot holds one vote per mandate.
    pub fn accounted_votes(&self, number_of_mandates: u32) -> u64 {
        self.accounted_ballots()
            .saturating_mul(number_of_mandates as u64)
            .saturating_sub(self.blank_votes)
            .saturating_sub(self.invalid_votes)
    }

    pub fn turnout(&self) -> f64 {
        turnout(self.received_ballots, self.eligible_voters)
    }
}

/// The accounted votes of a district.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct DistrictVotes {
    pub district: Option<String>,
    pub entity_ids: Vec<u32>,
    pub counted: bool,
    pub accounted_votes: u64,
}

/// A majority (majorz) election, with its candidates and the results by entity.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Election {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    pub number_of_mandates: u32,
    pub(crate) absolute_majority: Option<u64>,
    pub(crate) status: Option<Status>,
    pub(crate) candidates: Vec<Candidate>,
    pub(crate) results: Vec<ElectionResult>,
    pub(crate) last_change: Option<DateTime<Utc>>,
    pub(crate) last_result_change: Option<DateTime<Utc>>,
}

impl Election {
    pub fn new(
        id: &str,
        title: &str,
        date: NaiveDate,
        number_of_mandates: u32,
        at: DateTime<Utc>,
    ) -> Election {
        Election {
            id: id.to_string(),
            title: title.to_string(),
            date,
            number_of_mandates,
            absolute_majority: None,
            status: None,
            candidates: Vec::new(),
            results: Vec::new(),
            last_change: Some(at),
            last_result_change: None,
        }
    }

    pub fn status(&self) -> Option<Status> {
        self.status
    }

    pub fn absolute_majority(&self) -> Option<u64> {
        self.absolute_majority
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn results(&self) -> &[ElectionResult] {
        &self.results
    }

    pub fn last_change(&self) -> Option<DateTime<Utc>> {
        self.last_change
    }

    pub fn last_result_change(&self) -> Option<DateTime<Utc>> {
        self.last_result_change
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        latest([self.last_change, self.last_result_change])
    }

    pub fn set_status(&mut self, status: Option<Status>, at: DateTime<Utc>) {
        self.status = status;
        self.last_change = Some(at);
    }

    pub fn set_absolute_majority(&mut self, absolute_majority: Option<u64>, at: DateTime<Utc>) {
        self.absolute_majority = absolute_majority;
        self.last_change = Some(at);
    }

    pub fn add_candidate(&mut self, candidate: Candidate, at: DateTime<Utc>) {
        self.candidates.push(candidate);
        self.last_change = Some(at);
    }

    pub fn add_result(&mut self, result: ElectionResult, at: DateTime<Utc>) -> Result<(), VoteError> {
        if self.results.iter().any(|r| r.entity_id == result.entity_id) {
            return Err(VoteError::DuplicateEntity(result.entity_id));
        }
        debug!(
            "add_result: election {}: entity {} counted: {}",
            self.id, result.entity_id, result.counted
        );
        self.results.push(result);
        self.last_result_change = Some(at);
        Ok(())
    }

    pub fn update_result<F>(
        &mut self,
        entity_id: u32,
        update: F,
        at: DateTime<Utc>,
    ) -> Result<(), VoteError>
    where
        F: FnOnce(&mut ElectionResult),
    {
        let result = self
            .results
            .iter_mut()
            .find(|r| r.entity_id == entity_id)
            .ok_or(VoteError::UnknownEntity(entity_id))?;
        update(result);
        result.entity_id = entity_id;
        self.last_result_change = Some(at);
        Ok(())
    }

    /// Removes the results and everything derived from them.
    pub fn clear_results(&mut self) {
        info!("clear_results: election {}", self.id);
        self.absolute_majority = None;
        self.status = None;
        self.last_result_change = None;
        self.results.clear();
        for candidate in self.candidates.iter_mut() {
            candidate.elected = false;
        }
    }

    /// False as long as there are no results.
    pub fn counted(&self) -> bool {
        !self.results.is_empty() && self.results.iter().all(|r| r.counted)
    }

    pub fn progress(&self) -> (usize, usize) {
        progress(self.results.iter().map(|r| r.counted))
    }

    pub fn counted_entities(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self
            .results
            .iter()
            .filter(|r| r.counted && !r.name.is_empty())
            .map(|r| r.name.as_str())
            .collect();
        names.into_iter().map(|s| s.to_string()).collect()
    }

    /// True if at least one entity is counted.
    pub fn has_results(&self) -> bool {
        self.results.iter().any(|r| r.counted)
    }

    pub fn completed(&self) -> bool {
        completed(self.status, self.counted())
    }

    pub fn eligible_voters(&self) -> u64 {
        saturating_sum(self.results.iter().map(|r| r.eligible_voters))
    }

    pub fn received_ballots(&self) -> u64 {
        saturating_sum(self.results.iter().map(|r| r.received_ballots))
    }

    pub fn accounted_ballots(&self) -> u64 {
        saturating_sum(self.results.iter().map(|r| r.accounted_ballots()))
    }

    pub fn accounted_votes(&self) -> u64 {
        saturating_sum(
            self.results
                .iter()
                .map(|r| r.accounted_votes(self.number_of_mandates)),
        )
    }

    pub fn turnout(&self) -> f64 {
        turnout(self.received_ballots(), self.eligible_voters())
    }

    pub fn candidate_votes(&self, candidate_id: &str) -> u64 {
        saturating_sum(
            self.results
                .iter()
                .filter_map(|r| r.candidate_votes.get(candidate_id).copied()),
        )
    }

    /// Sorted by family name, then first name.
    pub fn elected_candidates(&self) -> Vec<&Candidate> {
        let mut elected: Vec<&Candidate> = self.candidates.iter().filter(|c| c.elected).collect();
        elected.sort_by(|a, b| {
            (a.family_name.as_str(), a.first_name.as_str())
                .cmp(&(b.family_name.as_str(), b.first_name.as_str()))
        });
        elected
    }

    /// Nothing is allocated before the election is completed.
    pub fn allocated_mandates(&self) -> usize {
        if !self.completed() {
            return 0;
        }
        self.candidates.iter().filter(|c| c.elected).count()
    }

    pub fn votes_by_district(&self) -> Vec<DistrictVotes> {
        let mut groups: BTreeMap<Option<&str>, Vec<&ElectionResult>> = BTreeMap::new();
        for r in self.results.iter() {
            groups.entry(r.district.as_deref()).or_default().push(r);
        }
        groups
            .into_iter()
            .map(|(district, results)| {
                let mut entity_ids: Vec<u32> = results.iter().map(|r| r.entity_id).collect();
                entity_ids.sort_unstable();
                DistrictVotes {
                    district: district.map(|s| s.to_string()),
                    entity_ids,
                    counted: results.iter().all(|r| r.counted),
                    accounted_votes: saturating_sum(
                        results
                            .iter()
                            .map(|r| r.accounted_votes(self.number_of_mandates)),
                    ),
                }
            })
            .collect()
    }
}

/// Several elections held together, such as the elections of all the
/// districts of a regional parliament.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ElectionCompound {
    pub id: String,
    pub title: String,
    pub elections: Vec<Election>,
}

impl ElectionCompound {
    pub fn new(id: &str, title: &str, elections: Vec<Election>) -> ElectionCompound {
        ElectionCompound {
            id: id.to_string(),
            title: title.to_string(),
            elections,
        }
    }

    pub fn counted(&self) -> bool {
        self.elections.iter().all(|e| e.counted())
    }

    /// (completed elections, total elections)
    pub fn progress(&self) -> (usize, usize) {
        progress(self.elections.iter().map(|e| e.completed()))
    }

    /// The titles of the completed elections.
    pub fn counted_entities(&self) -> Vec<String> {
        self.elections
            .iter()
            .filter(|e| e.completed())
            .map(|e| e.title.clone())
            .collect()
    }

    /// False without any election.
    pub fn completed(&self) -> bool {
        !self.elections.is_empty() && self.elections.iter().all(|e| e.completed())
    }

    pub fn has_results(&self) -> bool {
        self.elections.iter().any(|e| e.has_results())
    }

    pub fn number_of_mandates(&self) -> u32 {
        self.elections.iter().map(|e| e.number_of_mandates).sum()
    }

    pub fn allocated_mandates(&self) -> usize {
        self.elections.iter().map(|e| e.allocated_mandates()).sum()
    }

    pub fn elected_candidates(&self) -> Vec<&Candidate> {
        self.elections
            .iter()
            .flat_map(|e| e.elected_candidates())
            .collect()
    }

    pub fn last_result_change(&self) -> Option<DateTime<Utc>> {
        latest(self.elections.iter().map(|e| e.last_result_change))
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        latest(self.elections.iter().map(|e| e.last_modified()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(year: i32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap()
    }

    fn election(id: &str, mandates: u32) -> Election {
        Election::new(
            id,
            &format!("Election {}", id),
            NaiveDate::from_ymd_opt(2015, 6, 14).unwrap(),
            mandates,
            at(2001),
        )
    }

    fn candidate(id: &str, family_name: &str, first_name: &str, elected: bool) -> Candidate {
        Candidate {
            id: id.to_string(),
            family_name: family_name.to_string(),
            first_name: first_name.to_string(),
            elected,
            party: None,
        }
    }

    fn result(entity_id: u32, name: &str, counted: bool) -> ElectionResult {
        ElectionResult {
            entity_id,
            name: name.to_string(),
            counted,
            eligible_voters: 1000,
            received_ballots: 500,
            blank_ballots: 10,
            invalid_ballots: 40,
            blank_votes: 80,
            invalid_votes: 20,
            candidate_votes: [("1".to_string(), 300), ("2".to_string(), 200)]
                .into_iter()
                .collect(),
            ..ElectionResult::default()
        }
    }

    #[test]
    fn empty_election() {
        let e = election("e", 2);
        assert!(!e.counted());
        assert!(!e.has_results());
        assert!(!e.completed());
        assert_eq!(e.progress(), (0, 0));
        assert_eq!(e.allocated_mandates(), 0);
    }

    #[test]
    fn aggregation() {
        let mut e = election("e", 2);
        e.add_result(result(1, "Baar", true), at(2002)).unwrap();
        e.add_result(
            ElectionResult {
                district: Some("Nord".to_string()),
                ..result(2, "Aegeri", false)
            },
            at(2002),
        )
        .unwrap();
        assert!(!e.counted());
        assert!(e.has_results());
        assert_eq!(e.progress(), (1, 2));
        assert_eq!(e.counted_entities(), vec!["Baar"]);
        assert_eq!(e.accounted_ballots(), 900);
        // 450 * 2 - 80 - 20 per entity
        assert_eq!(e.accounted_votes(), 1600);
        assert_eq!(e.candidate_votes("1"), 600);
        assert_eq!(e.candidate_votes("3"), 0);
        assert_eq!(e.turnout(), 50.0);

        let districts = e.votes_by_district();
        assert_eq!(districts.len(), 2);
        assert_eq!(districts[0].district, None);
        assert!(districts[0].counted);
        assert_eq!(districts[1].district.as_deref(), Some("Nord"));
        assert!(!districts[1].counted);
        assert_eq!(districts[1].accounted_votes, 800);

        assert_eq!(
            e.add_result(result(2, "Aegeri", true), at(2003)),
            Err(VoteError::DuplicateEntity(2))
        );
        e.update_result(2, |r| r.counted = true, at(2003)).unwrap();
        assert!(e.counted());
        assert_eq!(e.last_result_change(), Some(at(2003)));
    }

    #[test]
    fn mandates_and_elected() {
        let mut e = election("e", 2);
        e.add_candidate(candidate("1", "Meier", "Peter", true), at(2001));
        e.add_candidate(candidate("2", "Ammann", "Ruth", true), at(2001));
        e.add_candidate(candidate("3", "Ammann", "Anna", true), at(2001));
        e.add_candidate(candidate("4", "Zürcher", "Hans", false), at(2001));

        let names: Vec<&str> = e
            .elected_candidates()
            .iter()
            .map(|c| c.first_name.as_str())
            .collect();
        assert_eq!(names, vec!["Anna", "Ruth", "Peter"]);

        assert_eq!(e.allocated_mandates(), 0);
        e.add_result(result(1, "Baar", true), at(2002)).unwrap();
        assert!(e.completed());
        assert_eq!(e.allocated_mandates(), 3);
        e.set_status(Some(Status::Interim), at(2003));
        assert_eq!(e.allocated_mandates(), 0);
    }

    #[test]
    fn clear_results() {
        let mut e = election("e", 1);
        e.add_candidate(candidate("1", "Meier", "Peter", true), at(2001));
        e.add_result(result(1, "Baar", true), at(2002)).unwrap();
        e.set_absolute_majority(Some(144), at(2002));
        e.set_status(Some(Status::Final), at(2002));
        e.clear_results();
        assert!(e.results().is_empty());
        assert_eq!(e.absolute_majority(), None);
        assert_eq!(e.status(), None);
        assert_eq!(e.last_result_change(), None);
        assert!(e.elected_candidates().is_empty());
    }

    #[test]
    fn compound() {
        let mut first = election("first", 2);
        first.add_candidate(candidate("1", "Meier", "Peter", true), at(2001));
        first.add_result(result(1, "Baar", true), at(2002)).unwrap();
        let mut second = election("second", 3);
        second.add_result(result(2, "Zug", false), at(2004)).unwrap();

        let mut compound = ElectionCompound::new("c", "Kantonsrat", vec![first, second]);
        assert!(!compound.counted());
        assert!(!compound.completed());
        assert!(compound.has_results());
        assert_eq!(compound.progress(), (1, 2));
        assert_eq!(compound.counted_entities(), vec!["Election first"]);
        assert_eq!(compound.number_of_mandates(), 5);
        assert_eq!(compound.allocated_mandates(), 1);
        assert_eq!(compound.elected_candidates().len(), 1);
        assert_eq!(compound.last_result_change(), Some(at(2004)));

        compound.elections[1]
            .update_result(2, |r| r.counted = true, at(2005))
            .unwrap();
        assert!(compound.counted());
        assert!(compound.completed());
        assert_eq!(compound.progress(), (2, 2));

        assert!(!ElectionCompound::new("d", "Empty", vec![]).completed());
    }
}

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info};

use crate::ballot::Ballot;
use crate::config::*;
use crate::{completed, latest, percentage, saturating_sum, turnout};

/// The ballots of a vote.
///
/// A simple vote asks one question. A complex vote asks for a proposal and
/// a counter-proposal, and a tie-breaker decides which one wins if both are
/// accepted.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum VoteKind {
    Simple(Ballot),
    Complex {
        proposal: Ballot,
        counter_proposal: Ballot,
        tie_breaker: Ballot,
    },
}

impl VoteKind {
    pub fn simple() -> VoteKind {
        VoteKind::Simple(Ballot::new(BallotType::Proposal))
    }

    pub fn complex() -> VoteKind {
        VoteKind::Complex {
            proposal: Ballot::new(BallotType::Proposal),
            counter_proposal: Ballot::new(BallotType::CounterProposal),
            tie_breaker: Ballot::new(BallotType::TieBreaker),
        }
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, VoteKind::Complex { .. })
    }

    pub fn ballots(&self) -> Vec<&Ballot> {
        match self {
            VoteKind::Simple(proposal) => vec![proposal],
            VoteKind::Complex {
                proposal,
                counter_proposal,
                tie_breaker,
            } => vec![proposal, counter_proposal, tie_breaker],
        }
    }

    fn ballots_mut(&mut self) -> Vec<&mut Ballot> {
        match self {
            VoteKind::Simple(proposal) => vec![proposal],
            VoteKind::Complex {
                proposal,
                counter_proposal,
                tie_breaker,
            } => vec![proposal, counter_proposal, tie_breaker],
        }
    }

    fn ballot_mut(&mut self, ballot_type: BallotType) -> Result<&mut Ballot, VoteError> {
        self.ballots_mut()
            .into_iter()
            .find(|b| b.ballot_type == ballot_type)
            .ok_or(VoteError::UnknownBallot(ballot_type))
    }
}

/// A vote on one or more ballots.
///
/// The results can only be changed through the vote, which keeps track of
/// when they changed. Every method that changes something takes the time of
/// the change.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Vote {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) shortcode: Option<String>,
    pub(crate) domain: Domain,
    pub(crate) date: NaiveDate,
    pub(crate) status: Option<Status>,
    pub(crate) has_expats: bool,
    pub(crate) kind: VoteKind,
    pub(crate) last_change: Option<DateTime<Utc>>,
    pub(crate) last_result_change: Option<DateTime<Utc>>,
}

impl Vote {
    pub fn new(
        id: &str,
        title: &str,
        date: NaiveDate,
        domain: Domain,
        kind: VoteKind,
        at: DateTime<Utc>,
    ) -> Vote {
        let mut kind = kind;
        for ballot in kind.ballots_mut() {
            ballot.last_change = Some(at);
        }
        let last_result_change = if kind.ballots().iter().any(|b| b.has_results()) {
            Some(at)
        } else {
            None
        };
        Vote {
            id: id.to_string(),
            title: title.to_string(),
            shortcode: None,
            domain,
            date,
            status: None,
            has_expats: false,
            kind,
            last_change: Some(at),
            last_result_change,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn shortcode(&self) -> Option<&str> {
        self.shortcode.as_deref()
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn status(&self) -> Option<Status> {
        self.status
    }

    pub fn has_expats(&self) -> bool {
        self.has_expats
    }

    pub fn kind(&self) -> &VoteKind {
        &self.kind
    }

    pub fn is_complex(&self) -> bool {
        self.kind.is_complex()
    }

    pub fn ballots(&self) -> Vec<&Ballot> {
        self.kind.ballots()
    }

    pub fn ballot(&self, ballot_type: BallotType) -> Option<&Ballot> {
        self.ballots()
            .into_iter()
            .find(|b| b.ballot_type == ballot_type)
    }

    pub fn proposal(&self) -> &Ballot {
        match &self.kind {
            VoteKind::Simple(proposal) => proposal,
            VoteKind::Complex { proposal, .. } => proposal,
        }
    }

    // ******** Metadata *********

    pub fn set_title(&mut self, title: &str, at: DateTime<Utc>) {
        self.title = title.to_string();
        self.last_change = Some(at);
    }

    pub fn set_shortcode(&mut self, shortcode: Option<&str>, at: DateTime<Utc>) {
        self.shortcode = shortcode.map(|s| s.to_string());
        self.last_change = Some(at);
    }

    pub fn set_domain(&mut self, domain: Domain, at: DateTime<Utc>) {
        self.domain = domain;
        self.last_change = Some(at);
    }

    pub fn set_date(&mut self, date: NaiveDate, at: DateTime<Utc>) {
        self.date = date;
        self.last_change = Some(at);
    }

    pub fn set_status(&mut self, status: Option<Status>, at: DateTime<Utc>) {
        self.status = status;
        self.last_change = Some(at);
    }

    pub fn set_has_expats(&mut self, has_expats: bool, at: DateTime<Utc>) {
        self.has_expats = has_expats;
        self.last_change = Some(at);
    }

    /// Changes the title of a ballot. This is not a change of the results.
    pub fn set_ballot_title(
        &mut self,
        ballot_type: BallotType,
        title: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<(), VoteError> {
        let ballot = self.kind.ballot_mut(ballot_type)?;
        ballot.set_title(title.map(|s| s.to_string()), at);
        Ok(())
    }

    /// Turns a simple vote into a complex one. The results of the proposal
    /// are kept.
    pub fn convert_to_complex(&mut self, at: DateTime<Utc>) -> Result<(), VoteError> {
        if self.kind.is_complex() {
            return Err(VoteError::AlreadyComplex);
        }
        let kind = std::mem::replace(&mut self.kind, VoteKind::simple());
        let proposal = match kind {
            VoteKind::Simple(proposal) => proposal,
            complex => {
                self.kind = complex;
                return Err(VoteError::AlreadyComplex);
            }
        };
        let mut counter_proposal = Ballot::new(BallotType::CounterProposal);
        counter_proposal.last_change = Some(at);
        let mut tie_breaker = Ballot::new(BallotType::TieBreaker);
        tie_breaker.last_change = Some(at);
        info!("convert_to_complex: vote {}", self.id);
        self.kind = VoteKind::Complex {
            proposal,
            counter_proposal,
            tie_breaker,
        };
        self.last_change = Some(at);
        Ok(())
    }

    /// Turns a complex vote into a simple one. Only possible as long as the
    /// counter-proposal and the tie-breaker have no results.
    pub fn convert_to_simple(&mut self, at: DateTime<Utc>) -> Result<(), VoteError> {
        match &self.kind {
            VoteKind::Simple(_) => return Err(VoteError::AlreadySimple),
            VoteKind::Complex {
                counter_proposal,
                tie_breaker,
                ..
            } => {
                for ballot in [counter_proposal, tie_breaker] {
                    if ballot.has_results() {
                        return Err(VoteError::BallotNotEmpty(ballot.ballot_type));
                    }
                }
            }
        }
        let kind = std::mem::replace(&mut self.kind, VoteKind::simple());
        if let VoteKind::Complex { proposal, .. } = kind {
            self.kind = VoteKind::Simple(proposal);
        }
        info!("convert_to_simple: vote {}", self.id);
        self.last_change = Some(at);
        Ok(())
    }

    // ******** Results *********

    pub fn add_result(
        &mut self,
        ballot_type: BallotType,
        result: BallotResult,
        at: DateTime<Utc>,
    ) -> Result<(), VoteError> {
        self.kind.ballot_mut(ballot_type)?.add_result(result)?;
        self.last_result_change = Some(at);
        Ok(())
    }

    pub fn update_result<F>(
        &mut self,
        ballot_type: BallotType,
        entity_id: u32,
        update: F,
        at: DateTime<Utc>,
    ) -> Result<(), VoteError>
    where
        F: FnOnce(&mut BallotResult),
    {
        self.kind
            .ballot_mut(ballot_type)?
            .update_result(entity_id, update)?;
        self.last_result_change = Some(at);
        Ok(())
    }

    pub fn remove_result(
        &mut self,
        ballot_type: BallotType,
        entity_id: u32,
        at: DateTime<Utc>,
    ) -> Result<BallotResult, VoteError> {
        let removed = self
            .kind
            .ballot_mut(ballot_type)?
            .remove_result(entity_id)?;
        self.last_result_change = Some(at);
        Ok(removed)
    }

    /// Replaces all the results of one ballot.
    pub fn set_results(
        &mut self,
        ballot_type: BallotType,
        results: Vec<BallotResult>,
        at: DateTime<Utc>,
    ) -> Result<(), VoteError> {
        debug!(
            "set_results: vote {}: {}: {} results",
            self.id,
            ballot_type,
            results.len()
        );
        self.kind
            .ballot_mut(ballot_type)?
            .replace_results(results)?;
        self.last_result_change = Some(at);
        Ok(())
    }

    /// Removes all the results and resets the status.
    pub fn clear_results(&mut self) {
        info!("clear_results: vote {}", self.id);
        self.status = None;
        self.last_result_change = None;
        for ballot in self.kind.ballots_mut() {
            ballot.clear_results();
        }
    }

    // ******** Aggregation *********

    /// True if every ballot is counted.
    pub fn counted(&self) -> bool {
        self.ballots().iter().all(|b| b.counted())
    }

    /// The outcome, `None` as long as the vote is not counted.
    pub fn answer(&self) -> Option<Answer> {
        if !self.counted() {
            return None;
        }
        let answer = match &self.kind {
            VoteKind::Simple(proposal) => {
                if proposal.accepted() == Some(true) {
                    Answer::Accepted
                } else {
                    Answer::Rejected
                }
            }
            VoteKind::Complex {
                proposal,
                counter_proposal,
                tie_breaker,
            } => match (proposal.accepted(), counter_proposal.accepted()) {
                (Some(true), Some(true)) => {
                    if tie_breaker.accepted() == Some(true) {
                        Answer::Proposal
                    } else {
                        Answer::CounterProposal
                    }
                }
                (Some(true), _) => Answer::Proposal,
                (_, Some(true)) => Answer::CounterProposal,
                _ => Answer::Rejected,
            },
        };
        Some(answer)
    }

    /// `None` as long as the vote is not counted.
    pub fn accepted(&self) -> Option<bool> {
        self.answer().map(|a| a != Answer::Rejected)
    }

    fn sum<F: Fn(&Ballot) -> u64>(&self, f: F) -> u64 {
        saturating_sum(self.ballots().into_iter().map(f))
    }

    // The totals are summed over all the ballots.

    pub fn yeas(&self) -> u64 {
        self.sum(|b| b.yeas())
    }

    pub fn nays(&self) -> u64 {
        self.sum(|b| b.nays())
    }

    pub fn empty(&self) -> u64 {
        self.sum(|b| b.empty())
    }

    pub fn invalid(&self) -> u64 {
        self.sum(|b| b.invalid())
    }

    pub fn eligible_voters(&self) -> u64 {
        self.sum(|b| b.eligible_voters())
    }

    pub fn expats(&self) -> u64 {
        self.sum(|b| b.expats())
    }

    pub fn cast_ballots(&self) -> u64 {
        self.sum(|b| b.cast_ballots())
    }

    pub fn turnout(&self) -> f64 {
        turnout(self.cast_ballots(), self.eligible_voters())
    }

    /// For complex votes, the percentage of the winning side: the
    /// counter-proposal if it won, the proposal otherwise.
    pub fn yeas_percentage(&self) -> f64 {
        match &self.kind {
            VoteKind::Simple(_) => percentage(self.yeas(), self.nays()).0,
            VoteKind::Complex {
                proposal,
                counter_proposal,
                ..
            } => match self.answer() {
                Some(Answer::CounterProposal) => counter_proposal.yeas_percentage(),
                _ => proposal.yeas_percentage(),
            },
        }
    }

    pub fn nays_percentage(&self) -> f64 {
        100.0 - self.yeas_percentage()
    }

    /// (counted entities, total entities), assuming every ballot has the
    /// same entities.
    pub fn progress(&self) -> (usize, usize) {
        let ballots = self.ballots();
        let (counted, total) = ballots
            .iter()
            .map(|b| b.progress())
            .fold((0, 0), |(c, t), (bc, bt)| (c + bc, t + bt));
        (counted / ballots.len(), total / ballots.len())
    }

    pub fn has_results(&self) -> bool {
        self.ballots().iter().any(|b| b.has_results())
    }

    pub fn counted_entities(&self) -> Vec<String> {
        let names: BTreeSet<String> = self
            .ballots()
            .iter()
            .flat_map(|b| b.counted_entities())
            .collect();
        names.into_iter().collect()
    }

    pub fn completed(&self) -> bool {
        completed(self.status, self.counted())
    }

    // ******** Timestamps *********

    /// The last time the vote itself changed (title, domain, status, ...).
    pub fn last_change(&self) -> Option<DateTime<Utc>> {
        self.last_change
    }

    /// The last time a result was added, changed or removed.
    pub fn last_result_change(&self) -> Option<DateTime<Utc>> {
        self.last_result_change
    }

    pub fn last_ballot_change(&self) -> Option<DateTime<Utc>> {
        latest(self.ballots().iter().map(|b| b.last_change))
    }

    /// The last time anything about the vote changed.
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        latest([
            self.last_change,
            self.last_result_change,
            self.last_ballot_change(),
        ])
    }

    /// One flat row per result, the ballots in order.
    pub fn export(&self) -> Vec<ExportRow> {
        let mut rows: Vec<ExportRow> = Vec::new();
        for ballot in self.ballots() {
            for result in ballot.results() {
                rows.push(ExportRow {
                    title: ballot.title().unwrap_or(&self.title).to_string(),
                    date: self.date.format("%Y-%m-%d").to_string(),
                    shortcode: self.shortcode.clone().unwrap_or_default(),
                    domain: self.domain,
                    status: self
                        .status
                        .map(|s| s.as_str())
                        .unwrap_or("unknown")
                        .to_string(),
                    ballot_type: ballot.ballot_type(),
                    district: result.district.clone().unwrap_or_default(),
                    name: result.name.clone(),
                    entity_id: result.entity_id,
                    counted: result.counted,
                    yeas: result.yeas,
                    nays: result.nays,
                    invalid: result.invalid,
                    empty: result.empty,
                    eligible_voters: result.eligible_voters,
                    expats: if result.expats > 0 {
                        Some(result.expats)
                    } else {
                        None
                    },
                });
            }
        }
        rows
    }
}

// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// The tally reported by one entity (usually a municipality) for one ballot.
///
/// `eligible_voters` and `expats` are 0 when the entity did not report them.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct BallotResult {
    pub entity_id: u32,
    pub name: String,
    pub district: Option<String>,
    pub counted: bool,
    pub yeas: u64,
    pub nays: u64,
    pub empty: u64,
    pub invalid: u64,
    pub eligible_voters: u64,
    pub expats: u64,
}

/// The question a ballot answers within a vote.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BallotType {
    Proposal,
    CounterProposal,
    TieBreaker,
}

impl BallotType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BallotType::Proposal => "proposal",
            BallotType::CounterProposal => "counter-proposal",
            BallotType::TieBreaker => "tie-breaker",
        }
    }

    pub fn parse(s: &str) -> Option<BallotType> {
        match s {
            "proposal" => Some(BallotType::Proposal),
            "counter-proposal" | "counter_proposal" => Some(BallotType::CounterProposal),
            "tie-breaker" | "tie_breaker" => Some(BallotType::TieBreaker),
            _ => None,
        }
    }
}

impl Display for BallotType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The publication status, set by whoever uploads the results.
///
/// It is independent from the counting progress, see [crate::completed].
#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Unknown,
    Interim,
    Final,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Unknown => "unknown",
            Status::Interim => "interim",
            Status::Final => "final",
        }
    }
}

/// The political level a vote or an election belongs to.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Federation,
    Canton,
    Region,
    District,
    Municipality,
}

// ******** Output data structures *********

/// The outcome of a vote.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Answer {
    Accepted,
    Rejected,
    Proposal,
    CounterProposal,
}

impl Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Answer::Accepted => "accepted",
            Answer::Rejected => "rejected",
            Answer::Proposal => "proposal",
            Answer::CounterProposal => "counter-proposal",
        };
        write!(f, "{}", s)
    }
}

/// The percentages of one entity, as shown on maps.
/// The percentages are only present once the entity is counted.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct EntityPercentage {
    pub counted: bool,
    pub yeas_percentage: Option<f64>,
    pub nays_percentage: Option<f64>,
}

/// The results of a ballot, summed up by district.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct DistrictResult {
    pub district: Option<String>,
    pub counted: bool,
    pub accepted: Option<bool>,
    pub yeas: u64,
    pub nays: u64,
    pub yeas_percentage: f64,
    pub nays_percentage: f64,
    pub empty: u64,
    pub invalid: u64,
    pub eligible_voters: u64,
    pub entity_ids: Vec<u32>,
}

/// One flat row per ballot result, the base of the csv/json exports.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct ExportRow {
    pub title: String,
    pub date: String,
    pub shortcode: String,
    pub domain: Domain,
    pub status: String,
    #[serde(rename = "type")]
    pub ballot_type: BallotType,
    pub district: String,
    pub name: String,
    pub entity_id: u32,
    pub counted: bool,
    pub yeas: u64,
    pub nays: u64,
    pub invalid: u64,
    pub empty: u64,
    pub eligible_voters: u64,
    pub expats: Option<u64>,
}

/// Errors raised when modifying votes and elections.
///
/// Reading aggregated values never fails.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum VoteError {
    AlreadyComplex,
    AlreadySimple,
    BallotNotEmpty(BallotType),
    UnknownBallot(BallotType),
    UnknownEntity(u32),
    DuplicateEntity(u32),
    MissingField(&'static str),
}

impl Error for VoteError {}

impl Display for VoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoteError::AlreadyComplex => write!(f, "the vote is already a complex vote"),
            VoteError::AlreadySimple => write!(f, "the vote is already a simple vote"),
            VoteError::BallotNotEmpty(bt) => {
                write!(f, "the {} ballot still contains results", bt)
            }
            VoteError::UnknownBallot(bt) => write!(f, "the vote has no {} ballot", bt),
            VoteError::UnknownEntity(id) => write!(f, "no result for entity {}", id),
            VoteError::DuplicateEntity(id) => write!(f, "entity {} has already a result", id),
            VoteError::MissingField(name) => write!(f, "missing field: {}", name),
        }
    }
}

pub use crate::config::*;
use crate::vote::{Vote, VoteKind};

use chrono::{DateTime, NaiveDate, Utc};

/// A builder for votes.
///
/// ```
/// use ballot_results::builder::VoteBuilder;
/// use ballot_results::{BallotType, Domain};
/// # use ballot_results::VoteError;
/// use chrono::{NaiveDate, Utc};
///
/// let vote = VoteBuilder::new("vote-2015-06-14")?
///     .title("Stipendieninitiative")
///     .date(NaiveDate::from_ymd_opt(2015, 6, 14).unwrap())
///     .domain(Domain::Federation)
///     .complex()
///     .build(Utc::now())?;
///
/// assert!(vote.ballot(BallotType::TieBreaker).is_some());
/// # Ok::<(), VoteError>(())
/// ```
pub struct VoteBuilder {
    pub(crate) _id: String,
    pub(crate) _title: Option<String>,
    pub(crate) _shortcode: Option<String>,
    pub(crate) _date: Option<NaiveDate>,
    pub(crate) _domain: Domain,
    pub(crate) _complex: bool,
    pub(crate) _has_expats: bool,
}

impl VoteBuilder {
    pub fn new(id: &str) -> Result<VoteBuilder, VoteError> {
        if id.trim().is_empty() {
            return Err(VoteError::MissingField("id"));
        }
        Ok(VoteBuilder {
            _id: id.to_string(),
            _title: None,
            _shortcode: None,
            _date: None,
            _domain: Domain::Federation,
            _complex: false,
            _has_expats: false,
        })
    }

    pub fn title(self, title: &str) -> VoteBuilder {
        VoteBuilder {
            _title: Some(title.to_string()),
            ..self
        }
    }

    pub fn shortcode(self, shortcode: &str) -> VoteBuilder {
        VoteBuilder {
            _shortcode: Some(shortcode.to_string()),
            ..self
        }
    }

    pub fn date(self, date: NaiveDate) -> VoteBuilder {
        VoteBuilder {
            _date: Some(date),
            ..self
        }
    }

    /// Defaults to the federation.
    pub fn domain(self, domain: Domain) -> VoteBuilder {
        VoteBuilder {
            _domain: domain,
            ..self
        }
    }

    /// The vote will have a counter-proposal and a tie-breaker.
    pub fn complex(self) -> VoteBuilder {
        VoteBuilder {
            _complex: true,
            ..self
        }
    }

    /// Whether the results of the swiss abroad are reported separately.
    pub fn expats(self, has_expats: bool) -> VoteBuilder {
        VoteBuilder {
            _has_expats: has_expats,
            ..self
        }
    }

    /// Creates the vote. The title and the date are required.
    pub fn build(self, at: DateTime<Utc>) -> Result<Vote, VoteError> {
        let title = match self._title {
            Some(t) if !t.trim().is_empty() => t,
            _ => return Err(VoteError::MissingField("title")),
        };
        let date = self._date.ok_or(VoteError::MissingField("date"))?;
        let kind = if self._complex {
            VoteKind::complex()
        } else {
            VoteKind::simple()
        };
        let mut vote = Vote::new(&self._id, &title, date, self._domain, kind, at);
        vote.shortcode = self._shortcode;
        vote.has_expats = self._has_expats;
        Ok(vote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn builds_simple_vote() {
        let vote = VoteBuilder::new("v")
            .unwrap()
            .title("Abstimmung")
            .shortcode("A")
            .date(NaiveDate::from_ymd_opt(2015, 6, 14).unwrap())
            .domain(Domain::Canton)
            .expats(true)
            .build(now())
            .unwrap();
        assert_eq!(vote.id(), "v");
        assert_eq!(vote.title(), "Abstimmung");
        assert_eq!(vote.shortcode(), Some("A"));
        assert_eq!(vote.domain(), Domain::Canton);
        assert!(vote.has_expats());
        assert!(!vote.is_complex());
        assert_eq!(vote.last_modified(), Some(now()));
    }

    #[test]
    fn requires_fields() {
        assert!(matches!(
            VoteBuilder::new(" "),
            Err(VoteError::MissingField("id"))
        ));
        let missing_title = VoteBuilder::new("v")
            .unwrap()
            .date(NaiveDate::from_ymd_opt(2015, 6, 14).unwrap())
            .build(now());
        assert_eq!(missing_title, Err(VoteError::MissingField("title")));
        let missing_date = VoteBuilder::new("v").unwrap().title("x").build(now());
        assert_eq!(missing_date, Err(VoteError::MissingField("date")));
    }
}

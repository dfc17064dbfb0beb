/*!

# Quick start

This example counts a complex vote by hand, without reading any file.

```
use ballot_results::builder::VoteBuilder;
use ballot_results::{Answer, BallotResult, BallotType};
use chrono::{NaiveDate, Utc};

let mut vote = VoteBuilder::new("vote")?
    .title("Verkehrsinitiative")
    .date(NaiveDate::from_ymd_opt(2016, 2, 28).unwrap())
    .complex()
    .build(Utc::now())?;

let result = |yeas, nays| BallotResult {
    entity_id: 1711,
    name: "Zug".to_string(),
    counted: true,
    yeas,
    nays,
    eligible_voters: 200,
    ..BallotResult::default()
};

vote.add_result(BallotType::Proposal, result(70, 30), Utc::now())?;
vote.add_result(BallotType::CounterProposal, result(80, 20), Utc::now())?;

// The tie-breaker is missing: no answer yet.
assert_eq!(vote.answer(), None);
assert!(!vote.counted());

vote.add_result(BallotType::TieBreaker, result(0, 100), Utc::now())?;
assert_eq!(vote.answer(), Some(Answer::CounterProposal));
assert_eq!(vote.yeas_percentage(), 80.0);
assert!(vote.completed());
# Ok::<(), ballot_results::VoteError>(())
```

Both the proposal and the counter-proposal have more yeas than nays, and the
tie-breaker prefers the counter-proposal.

Reading the results from files is done by the `votetally` program, see the
[manual](crate::manual).
*/

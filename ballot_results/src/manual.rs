/*!

This is the long-form manual for `ballot_results` and `votetally`.

## Votes

A vote asks the voters one or more questions, each of them being a ballot:

* a simple vote has a single `proposal` ballot,
* a complex vote has a `proposal`, a `counter-proposal` and a `tie-breaker`.

Every entity (usually a municipality) reports one result per ballot: the
yeas, the nays, the empty and the invalid ballots, the number of eligible
voters and whether the result is final (`counted`).

### Answers

The answer of a vote stays unknown (`None`) until every result of every
ballot is counted. Then:

* a simple vote is `accepted` if there are more yeas than nays. A tie is
  `rejected`.
* a complex vote is `rejected` if neither the proposal nor the
  counter-proposal have more yeas than nays. If only one of them does, it
  wins. If both do, the tie-breaker decides: more yeas than nays for the
  `proposal`, otherwise the `counter-proposal`.

### Percentages

The percentages of yeas and nays ignore the empty and invalid ballots. If
there are neither yeas nor nays, the yeas are at 0% and the nays at 100%.

For complex votes the percentages shown for the whole vote are those of the
winning side (the counter-proposal if it won, the proposal otherwise).

The turnout is the number of cast ballots divided by the eligible voters.

### Completion

The status of a vote is set by whoever uploads the results:

| status            | completed                     |
|-------------------|-------------------------------|
| `final`           | yes                           |
| `interim`         | no                            |
| `unknown` or none | once everything is counted    |

A vote without any result is never counted.

## Elections

Elections follow the same rules: an election is counted once all its
results are, an election compound once all its elections are. Mandates are
only allocated to the elected candidates once an election is completed.

## Input formats

`votetally` reads results in the default format, as CSV (comma, semicolon
or tab separated, UTF-8 or Windows-1252) or as Excel file (`xls`, `xlsx`).
For Excel files the sheet `Resultate` is used if it exists, the first sheet
otherwise.

| column                  | content                                       |
|-------------------------|-----------------------------------------------|
| `ID`                    | the id of the entity, `0` for the expats      |
| `Ja Stimmen`            | yeas                                          |
| `Nein Stimmen`          | nays                                          |
| `Stimmberechtigte`      | eligible voters                               |
| `Leere Stimmzettel`     | empty ballots                                 |
| `Ungültige Stimmzettel` | invalid ballots                               |

The column names do not need to match exactly: small typos, different
casing, accents or extra spaces are accepted, as long as each column can
only be one of the expected ones. Extra columns are ignored.

Any of `unknown`, `unbekannt`, `inconnu` or `sconosciuto` in the tallies
marks the entity as not counted yet. Entities missing from the file are
added as not counted.

The file must not contain empty lines, except at the end.

## Configuration

The configuration is a JSON file:

```json
{
  "vote": {
    "id": "vote-2015-06-14",
    "title": "Stipendieninitiative",
    "date": "2015-06-14",
    "domain": "canton",
    "type": "simple",
    "hasExpats": false
  },
  "entities": [
    { "id": 1701, "name": "Baar", "district": "Baar" }
  ],
  "resultFileSources": [
    { "ballotType": "proposal", "filePath": "proposal.csv" }
  ]
}
```

The paths of the files are relative to the configuration file.
*/

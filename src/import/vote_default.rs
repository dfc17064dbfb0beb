// The default format for vote results: one row per entity.

use crate::import::*;
use std::collections::BTreeSet;

/// The expected headers, matched loosely against the ones of the file.
pub const HEADERS: [&str; 6] = [
    "id",
    "ja stimmen",
    "nein stimmen",
    "stimmberechtigte",
    "leere stimmzettel",
    "ungültige stimmzettel",
];

/// Values marking an entity as not counted yet.
pub const UNKNOWN_VALUES: [&str; 4] = ["unknown", "unbekannt", "inconnu", "sconosciuto"];

/// The ids used by the statistical office for the swiss abroad. They are
/// all imported as entity 0.
pub fn is_expats(entity_id: u32) -> bool {
    entity_id == 9170 || ((19010..=19260).contains(&entity_id) && entity_id % 10 == 0)
}

fn file_label(ballot_type: BallotType) -> &'static str {
    match ballot_type {
        BallotType::Proposal => "Proposal",
        BallotType::CounterProposal => "Counter Proposal",
        BallotType::TieBreaker => "Tie-Breaker",
    }
}

fn is_unknown(value: Option<&str>) -> bool {
    value
        .map(|v| UNKNOWN_VALUES.contains(&v.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Imports the results of one ballot of a vote.
///
/// All the errors of the file are returned, sorted by row. The results of
/// the ballot are only replaced if there are none. Entities of the principal
/// missing in the file are added as not counted.
pub fn import_vote_default(
    vote: &mut Vote,
    principal: &Principal,
    ballot_type: BallotType,
    bytes: &[u8],
    mimetype: &str,
    at: DateTime<Utc>,
) -> Vec<FileImportError> {
    let filename = file_label(ballot_type);
    let csv = match load_csv(bytes, mimetype, &HEADERS, Some(filename), None) {
        Ok(csv) => csv,
        Err(e) => return vec![e],
    };

    let mut errors: Vec<FileImportError> = Vec::new();
    let mut added: BTreeSet<u32> = BTreeSet::new();
    let mut results: Vec<BallotResult> = Vec::new();

    for line in csv.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                errors.push(row_error(&e, Some(filename)));
                continue;
            }
        };
        let mut line_errors: Vec<String> = Vec::new();

        let entity_id = match validate_integer::<u32>(&line, "id", false, 0) {
            Ok(id) if is_expats(id) => Some(0),
            Ok(id) => Some(id),
            Err(e) => {
                line_errors.push(e.to_string());
                None
            }
        };

        // The swiss abroad are only imported if the vote reports them.
        if entity_id == Some(0) && !vote.has_expats() {
            debug!("import_vote_default: row {}: skipping expats", line.rownumber);
            continue;
        }

        if let Some(id) = entity_id {
            if !added.insert(id) {
                line_errors.push(format!("{} was found twice", id));
            } else if id != 0 && !principal.knows(id) {
                line_errors.push(format!("{} is unknown", id));
            }
        }

        let counted = !["ja_stimmen", "nein_stimmen", "leere_stimmzettel", "ungultige_stimmzettel"]
            .iter()
            .any(|column| is_unknown(line.get(column)));

        let mut invalid_values = false;
        let mut tally = |column: &str| -> u64 {
            if is_unknown(line.get(column)) {
                return 0;
            }
            match validate_integer::<u64>(&line, column, true, 0) {
                Ok(v) => v,
                Err(e) => {
                    line_errors.push(e.to_string());
                    invalid_values = true;
                    0
                }
            }
        };
        let yeas = tally("ja_stimmen");
        let nays = tally("nein_stimmen");
        let eligible_voters = tally("stimmberechtigte");
        let empty = tally("leere_stimmzettel");
        let invalid = tally("ungultige_stimmzettel");

        if counted && !invalid_values {
            if eligible_voters == 0 {
                line_errors.push("No eligible voters".to_string());
            }
            let cast = yeas
                .checked_add(nays)
                .and_then(|v| v.checked_add(empty))
                .and_then(|v| v.checked_add(invalid));
            if cast.map(|c| c > eligible_voters).unwrap_or(true) {
                line_errors.push("More cast votes than eligible voters".to_string());
            }
        }

        if !line_errors.is_empty() {
            for e in line_errors {
                errors.push(FileImportError::new(&e, Some(line.rownumber), Some(filename)));
            }
            continue;
        }

        if let Some(id) = entity_id {
            let (name, district) = match principal.entity(id) {
                Some(entity) => (entity.name.clone(), entity.district.clone()),
                None => (String::new(), None),
            };
            results.push(BallotResult {
                entity_id: id,
                name,
                district,
                counted,
                yeas,
                nays,
                empty,
                invalid,
                eligible_voters,
                expats: 0,
            });
        }
    }

    if errors.is_empty() && results.is_empty() {
        errors.push(FileImportError::new("No data found", None, Some(filename)));
    }

    if !errors.is_empty() {
        errors.sort();
        errors.dedup();
        warn!(
            "import_vote_default: {}: {} errors",
            vote.id(),
            errors.len()
        );
        return errors;
    }

    for (id, entity) in principal.entities() {
        if !added.contains(&id) {
            results.push(BallotResult {
                entity_id: id,
                name: entity.name.clone(),
                district: entity.district.clone(),
                counted: false,
                ..BallotResult::default()
            });
        }
    }

    info!(
        "import_vote_default: {}: {} results for the {}",
        vote.id(),
        results.len(),
        ballot_type
    );
    match vote.set_results(ballot_type, results, at) {
        Ok(()) => Vec::new(),
        Err(e) => vec![FileImportError::new(&e.to_string(), None, Some(filename))],
    }
}

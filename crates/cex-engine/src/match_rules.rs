//! The match predicate used by both the validator and the scheduler (§4.7):
//! scoring a required input against an available piece of data.

use crate::data::{DataInfo, TypeTag};

/// Match quality between a required input and a candidate, ordered so a
/// richer match always outranks a weaker one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchScore {
    None_,
    TypeOnly,
    NameOnly,
    NameAndType,
}

fn name_matches(aliases: &[String], candidate: &DataInfo) -> bool {
    aliases.iter().any(|a| a == &candidate.name)
}

fn type_matches(required_type: &TypeTag, candidate: &DataInfo) -> bool {
    required_type == &candidate.type_tag || required_type.is_unknown() || candidate.type_tag.is_unknown()
}

pub fn score(aliases: &[String], required_type: &TypeTag, candidate: &DataInfo) -> MatchScore {
    match (name_matches(aliases, candidate), type_matches(required_type, candidate)) {
        (true, true) => MatchScore::NameAndType,
        (true, false) => MatchScore::NameOnly,
        (false, true) => MatchScore::TypeOnly,
        (false, false) => MatchScore::None_,
    }
}

/// Outcome of resolving a required input against a set of candidates.
pub enum MatchOutcome<'a> {
    Unsatisfied,
    Ambiguous,
    Resolved(&'a DataInfo),
}

/// Pick the single best-scoring candidate, per §4.7: zero matches is
/// unsatisfied, a tie among the best score (as long as it's positive) is
/// ambiguous.
pub fn best_match<'a>(
    aliases: &[String],
    required_type: &TypeTag,
    candidates: impl IntoIterator<Item = &'a DataInfo>,
) -> MatchOutcome<'a> {
    let mut best_score = MatchScore::None_;
    let mut best: Vec<&DataInfo> = Vec::new();

    for candidate in candidates {
        let s = score(aliases, required_type, candidate);
        if s == MatchScore::None_ {
            continue;
        }
        if s > best_score {
            best_score = s;
            best.clear();
            best.push(candidate);
        } else if s == best_score {
            best.push(candidate);
        }
    }

    match best.len() {
        0 => MatchOutcome::Unsatisfied,
        1 => MatchOutcome::Resolved(best[0]),
        _ => MatchOutcome::Ambiguous,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn data(name: &str, type_tag: &str) -> DataInfo {
        DataInfo::required(name, TypeTag::new(type_tag.to_string()))
    }

    #[test]
    fn name_and_type_beats_name_only() {
        let exact = data("x", "int");
        let name_only = data("x", "str");
        let aliases = vec!["x".to_string()];
        let required = TypeTag::new("int");

        match best_match(&aliases, &required, [&name_only, &exact]) {
            MatchOutcome::Resolved(d) => assert_eq!(d.type_tag, TypeTag::new("int")),
            _ => panic!("expected a resolution"),
        }
    }

    #[test]
    fn tie_at_positive_score_is_ambiguous() {
        let a = data("x", "int");
        let b = data("x", "int");
        let aliases = vec!["x".to_string()];
        let required = TypeTag::new("int");

        assert!(matches!(
            best_match(&aliases, &required, [&a, &b]),
            MatchOutcome::Ambiguous
        ));
    }

    #[test]
    fn no_candidates_is_unsatisfied() {
        let aliases = vec!["x".to_string()];
        let required = TypeTag::new("int");
        assert!(matches!(
            best_match(&aliases, &required, std::iter::empty()),
            MatchOutcome::Unsatisfied
        ));
    }

    #[test]
    fn unknown_type_on_either_side_matches() {
        let candidate = data("x", "unknown");
        let aliases = vec!["x".to_string()];
        let required = TypeTag::new("int");
        match best_match(&aliases, &required, [&candidate]) {
            MatchOutcome::Resolved(_) => {}
            _ => panic!("unknown type should satisfy any required type"),
        }
    }

    proptest::proptest! {
        /// A candidate whose name is in the alias list and whose type
        /// exactly matches the required type always scores `NameAndType`,
        /// the best possible score, no matter what the strings are (§4.7).
        #[test]
        fn exact_name_and_type_always_scores_best(
            name in "[a-z]{1,6}", type_name in "[a-z]{1,6}",
        ) {
            let candidate = data(&name, &type_name);
            let aliases = vec![name];
            let required = TypeTag::new(type_name);
            prop_assert_eq!(score(&aliases, &required, &candidate), MatchScore::NameAndType);
        }

        /// A candidate whose name never appears in the alias list and whose
        /// type never matches the required type (and neither side is
        /// unknown) always scores `None_`.
        #[test]
        fn disjoint_name_and_type_always_scores_none(
            candidate_name in "[a-z]{1,6}", alias in "[A-Z]{1,6}",
            candidate_type in "[a-z]{1,6}", required_type in "[A-Z]{1,6}",
        ) {
            let candidate = data(&candidate_name, &candidate_type);
            let aliases = vec![alias];
            let required = TypeTag::new(required_type);
            prop_assert_eq!(score(&aliases, &required, &candidate), MatchScore::None_);
        }

        /// An unknown-typed candidate always satisfies any required type,
        /// so its score is never `None_` as long as its name matches.
        #[test]
        fn unknown_candidate_type_always_satisfies(name in "[a-z]{1,6}", required_type in "[a-z]{1,6}") {
            let candidate = data(&name, "unknown");
            let aliases = vec![name];
            let required = TypeTag::new(required_type);
            prop_assert_eq!(score(&aliases, &required, &candidate), MatchScore::NameAndType);
        }
    }
}

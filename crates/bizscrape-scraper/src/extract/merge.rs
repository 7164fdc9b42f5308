use super::{CandidateFields, ExtractionSignal};
use crate::normalize::normalize_url;

/// Merges signals from all strategies into one candidate per listing unit.
///
/// Strategies are folded in descending rank. A lower-ranked unit joins an
/// existing group when their listing URLs normalize to the same value.
/// Failing that, units pair by position, but only when both strategies
/// produced the same number of units and the pair does not carry two
/// different URLs. When each side saw exactly one unit the page describes a
/// single listing, and the two pair regardless of URL. Anything left
/// unpaired becomes its own group. Within a group, the highest-ranked
/// non-empty value wins per field.
#[must_use]
pub fn merge_signals(signals: Vec<ExtractionSignal>) -> Vec<CandidateFields> {
    let mut by_strategy: Vec<(u8, &'static str, Vec<CandidateFields>)> = Vec::new();
    for signal in signals {
        match by_strategy
            .iter_mut()
            .find(|(_, name, _)| *name == signal.strategy)
        {
            Some((_, _, units)) => units.push(signal.fields),
            None => by_strategy.push((signal.rank, signal.strategy, vec![signal.fields])),
        }
    }
    by_strategy.sort_by_key(|(rank, _, _)| std::cmp::Reverse(*rank));

    let mut groups: Vec<CandidateFields> = Vec::new();
    for (_, _, units) in by_strategy {
        if groups.is_empty() {
            groups = units;
            continue;
        }

        let base_len = groups.len();
        let positional = units.len() == base_len;
        let single_listing = base_len == 1 && units.len() == 1;
        let mut paired = vec![false; base_len];
        let mut leftovers = Vec::new();

        for (idx, unit) in units.into_iter().enumerate() {
            let key = url_key(&unit);
            let by_url = key.as_ref().and_then(|k| {
                (0..base_len).find(|&g| !paired[g] && url_key(&groups[g]).as_ref() == Some(k))
            });
            let by_position = || {
                let allowed = single_listing
                    || compatible(key.as_ref(), url_key(&groups[idx]).as_ref());
                (positional && !paired[idx] && allowed).then_some(idx)
            };
            match by_url.or_else(by_position) {
                Some(g) => {
                    paired[g] = true;
                    groups[g].fill_from(unit);
                }
                None => leftovers.push(unit),
            }
        }
        groups.extend(leftovers);
    }
    groups
}

fn url_key(fields: &CandidateFields) -> Option<String> {
    fields.listing_url.as_deref().and_then(normalize_url)
}

/// Two units may share a position unless they point at different listings.
fn compatible(a: Option<&String>, b: Option<&String>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

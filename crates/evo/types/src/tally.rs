//! Stable "most common" ranking.

use serde::{Deserialize, Serialize};

/// A name with its occurrence count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub name: String,
    pub count: usize,
}

/// Count occurrences and rank them by count, descending.
///
/// Ties keep the order in which each name was first seen, so the result is
/// fully determined by the input sequence.
pub fn rank_most_common<I, S>(items: I) -> Vec<Tally>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut tallies: Vec<Tally> = Vec::new();
    for item in items {
        let name = item.into();
        match tallies.iter_mut().find(|t| t.name == name) {
            Some(t) => t.count += 1,
            None => tallies.push(Tally { name, count: 1 }),
        }
    }
    // sort_by is stable
    tallies.sort_by(|a, b| b.count.cmp(&a.count));
    tallies
}

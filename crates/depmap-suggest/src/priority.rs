use std::collections::HashMap;

use depmap_core::{char_priority, MUTUAL_CHAR};

use crate::model::Suggestion;

/// Merges suggestions for the same target key, keeping the highest-priority
/// character seen and collapsing an equal-priority `<`/`>` conflict to `x`.
/// Any other equal-priority conflict keeps whichever candidate arrived
/// first, matching the dict-update order of the source algorithm.
pub fn combine_with_char_priority(suggestions: Vec<Suggestion>) -> Vec<Suggestion> {
    let mut combined: HashMap<String, char> = HashMap::new();

    for suggestion in suggestions {
        if suggestion.target_key.is_empty() {
            continue;
        }
        match combined.get(&suggestion.target_key).copied() {
            None => {
                combined.insert(suggestion.target_key, suggestion.dep_char);
            }
            Some(current) => {
                let current_priority = char_priority(current);
                let new_priority = char_priority(suggestion.dep_char);
                if new_priority > current_priority {
                    combined.insert(suggestion.target_key, suggestion.dep_char);
                } else if new_priority == current_priority && suggestion.dep_char != current {
                    let is_directional_pair =
                        matches!((current, suggestion.dep_char), ('<', '>') | ('>', '<'));
                    if is_directional_pair {
                        combined.insert(suggestion.target_key, MUTUAL_CHAR);
                    }
                    // else: keep the existing character.
                }
            }
        }
    }

    combined
        .into_iter()
        .map(|(target_key, dep_char)| Suggestion { target_key, dep_char })
        .collect()
}

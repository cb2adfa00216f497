/* Transition relation of a PDA: (state, trigger, stack top) -> ordered list of moves.
 * The order of the moves under one key is the order they were declared in, which is the
 * order the first-candidate stepper and the search try them in. */

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::warn;

use crate::pda::ConfigurationError;
use crate::symbol::{Symbol, Trigger};

/// A transition as written by the user, with states and symbols given by name.
/// `push` is listed bottom to top: its last symbol becomes the new stack top.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionSpec {
    pub from: String,
    pub input: String,
    pub top: String,
    pub to: String,
    #[serde(default)]
    pub push: Vec<String>,
}

impl TransitionSpec {
    pub fn new(from: &str, input: &str, top: &str, to: &str, push: &[&str]) -> Self {
        TransitionSpec {
            from: from.to_string(),
            input: input.to_string(),
            top: top.to_string(),
            to: to.to_string(),
            push: push.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Target of a transition: the next state and what replaces the popped top.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Move {
    pub next_state: usize,
    pub push: Vec<Symbol>,
}

#[derive(Debug, Clone, Default)]
pub struct TransitionTable {
    moves: BTreeMap<usize, BTreeMap<Trigger, BTreeMap<Symbol, Vec<Move>>>>,
}

impl TransitionTable {
    /// Build the table, checking every state and symbol against the declarations.
    pub fn new(
        specs: &[TransitionSpec],
        states: &HashMap<String, usize>,
        input_alphabet: &BTreeSet<Symbol>,
        stack_alphabet: &BTreeSet<Symbol>,
    ) -> Result<Self, ConfigurationError> {
        let mut table = TransitionTable::default();
        let mut seen: HashSet<(usize, Trigger, Symbol, Move)> = HashSet::new();

        for spec in specs {
            let from = *states
                .get(spec.from.trim())
                .ok_or_else(|| ConfigurationError::UnknownState(spec.from.clone()))?;
            let next_state = *states
                .get(spec.to.trim())
                .ok_or_else(|| ConfigurationError::UnknownState(spec.to.clone()))?;

            let trigger = Trigger::parse(&spec.input);
            if let Trigger::Input(symbol) = &trigger {
                if !input_alphabet.contains(symbol) {
                    return Err(ConfigurationError::UnknownInputSymbol(symbol.to_string()));
                }
            }

            let top = Symbol::new(spec.top.trim());
            if !stack_alphabet.contains(&top) {
                return Err(ConfigurationError::UnknownStackSymbol(top.to_string()));
            }

            let mut push = Vec::new();
            for name in &spec.push {
                let symbol = Symbol::new(name.trim());
                if symbol.is_epsilon() {
                    continue;
                }
                if !stack_alphabet.contains(&symbol) {
                    return Err(ConfigurationError::UnknownStackSymbol(symbol.to_string()));
                }
                push.push(symbol);
            }

            let target = Move { next_state, push };

            if !seen.insert((from, trigger.clone(), top.clone(), target.clone())) {
                warn!(
                    "duplicate transition ({}, {}, {}) -> {} ignored",
                    spec.from, trigger, top, spec.to
                );
                continue;
            }

            table
                .moves
                .entry(from)
                .or_default()
                .entry(trigger)
                .or_default()
                .entry(top)
                .or_default()
                .push(target);
        }

        Ok(table)
    }

    /// All moves for the key, in declaration order. Empty if nothing matches.
    pub fn lookup(&self, state: usize, trigger: &Trigger, top: &Symbol) -> &[Move] {
        self.moves
            .get(&state)
            .and_then(|by_trigger| by_trigger.get(trigger))
            .and_then(|by_top| by_top.get(top))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every transition as (source, trigger, top, move), ordered by key
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Trigger, &Symbol, &Move)> {
        self.moves.iter().flat_map(|(state, by_trigger)| {
            by_trigger.iter().flat_map(move |(trigger, by_top)| {
                by_top.iter().flat_map(move |(top, moves)| {
                    moves.iter().map(move |target| (*state, trigger, top, target))
                })
            })
        })
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// True if no key has more than one move and no (state, top) pair offers both an
    /// ε-move and an input-consuming move.
    pub fn is_deterministic(&self) -> bool {
        for by_trigger in self.moves.values() {
            let epsilon_tops: HashSet<&Symbol> = by_trigger
                .get(&Trigger::Epsilon)
                .map(|by_top| by_top.keys().collect())
                .unwrap_or_default();

            for (trigger, by_top) in by_trigger {
                for (top, moves) in by_top {
                    if moves.len() > 1 {
                        return false;
                    }
                    if !trigger.is_epsilon() && epsilon_tops.contains(top) {
                        return false;
                    }
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod transition_tests {
    use super::*;

    fn setup() -> (HashMap<String, usize>, BTreeSet<Symbol>, BTreeSet<Symbol>) {
        let states = [("q0".to_string(), 0), ("q1".to_string(), 1)]
            .into_iter()
            .collect();
        let input = ["a", "b"].iter().map(|s| Symbol::from(*s)).collect();
        let stack = ["A", "$"].iter().map(|s| Symbol::from(*s)).collect();
        (states, input, stack)
    }

    #[test]
    fn test_lookup_keeps_declaration_order() {
        let (states, input, stack) = setup();
        let specs = vec![
            TransitionSpec::new("q0", "a", "$", "q1", &["$"]),
            TransitionSpec::new("q0", "a", "$", "q0", &["$", "A"]),
            TransitionSpec::new("q0", "ε", "$", "q1", &[]),
        ];
        let table = TransitionTable::new(&specs, &states, &input, &stack).unwrap();

        let moves = table.lookup(0, &Trigger::Input(Symbol::from("a")), &Symbol::from("$"));
        assert_eq!(moves.len(), 2);
        assert_eq!(moves[0].next_state, 1);
        assert_eq!(moves[1].next_state, 0);
        assert_eq!(moves[1].push, vec![Symbol::from("$"), Symbol::from("A")]);

        let moves = table.lookup(0, &Trigger::Epsilon, &Symbol::from("$"));
        assert_eq!(moves.len(), 1);
        assert!(moves[0].push.is_empty());

        assert!(table
            .lookup(1, &Trigger::Input(Symbol::from("b")), &Symbol::from("A"))
            .is_empty());
        assert_eq!(table.len(), 3);
        assert!(!table.is_deterministic());
    }

    #[test]
    fn test_duplicates_are_dropped() {
        let (states, input, stack) = setup();
        let specs = vec![
            TransitionSpec::new("q0", "a", "$", "q0", &["$", "A"]),
            TransitionSpec::new("q0", "a", "$", "q0", &["$", "A"]),
        ];
        let table = TransitionTable::new(&specs, &states, &input, &stack).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.is_deterministic());
    }

    #[test]
    fn test_epsilon_push_entries_are_skipped() {
        let (states, input, stack) = setup();
        let specs = vec![TransitionSpec::new("q0", "b", "A", "q1", &["ε"])];
        let table = TransitionTable::new(&specs, &states, &input, &stack).unwrap();
        let moves = table.lookup(0, &Trigger::Input(Symbol::from("b")), &Symbol::from("A"));
        assert!(moves[0].push.is_empty());
    }

    #[test]
    fn test_undeclared_references() {
        let (states, input, stack) = setup();

        let specs = vec![TransitionSpec::new("q9", "a", "$", "q0", &[])];
        let err = TransitionTable::new(&specs, &states, &input, &stack).unwrap_err();
        assert_eq!(err, ConfigurationError::UnknownState("q9".to_string()));

        let specs = vec![TransitionSpec::new("q0", "c", "$", "q0", &[])];
        let err = TransitionTable::new(&specs, &states, &input, &stack).unwrap_err();
        assert_eq!(err, ConfigurationError::UnknownInputSymbol("c".to_string()));

        let specs = vec![TransitionSpec::new("q0", "a", "Z", "q0", &[])];
        let err = TransitionTable::new(&specs, &states, &input, &stack).unwrap_err();
        assert_eq!(err, ConfigurationError::UnknownStackSymbol("Z".to_string()));

        let specs = vec![TransitionSpec::new("q0", "a", "$", "q0", &["$", "B"])];
        let err = TransitionTable::new(&specs, &states, &input, &stack).unwrap_err();
        assert_eq!(err, ConfigurationError::UnknownStackSymbol("B".to_string()));
    }

    #[test]
    fn test_epsilon_and_input_on_same_top_is_nondeterministic() {
        let (states, input, stack) = setup();
        let specs = vec![
            TransitionSpec::new("q0", "a", "A", "q0", &["A", "A"]),
            TransitionSpec::new("q0", "ε", "A", "q1", &["A"]),
        ];
        let table = TransitionTable::new(&specs, &states, &input, &stack).unwrap();
        assert!(!table.is_deterministic());

        let specs = vec![
            TransitionSpec::new("q0", "a", "A", "q0", &["A", "A"]),
            TransitionSpec::new("q0", "ε", "$", "q1", &["$"]),
        ];
        let table = TransitionTable::new(&specs, &states, &input, &stack).unwrap();
        assert!(table.is_deterministic());
    }
}

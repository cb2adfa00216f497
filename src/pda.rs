//! The automaton descriptor.
//!
//! A [`Pda`] is built once through [`PdaBuilder`] (or from a
//! [`PdaDescriptor`](crate::loader::PdaDescriptor)) and is immutable afterwards. States
//! are interned to dense ids so the accepting set can be kept as a bit vector.

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::engine::{self, Configuration, SearchOptions};
use crate::symbol::{self, Symbol};
use crate::transition::{TransitionSpec, TransitionTable};

/// When a run counts as accepted, once all of the input has been read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Acceptance {
    /// The current state is an accepting state
    #[default]
    FinalState,
    /// Only the bottom marker is left on the stack
    EmptyStack,
    /// Either of the two conditions holds
    Either,
    /// Both conditions hold
    Both,
}

impl Acceptance {
    pub fn is_satisfied(&self, in_final_state: bool, stack_empty: bool) -> bool {
        match self {
            Acceptance::FinalState => in_final_state,
            Acceptance::EmptyStack => stack_empty,
            Acceptance::Either => in_final_state || stack_empty,
            Acceptance::Both => in_final_state && stack_empty,
        }
    }
}

impl FromStr for Acceptance {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "final" | "final-state" => Ok(Acceptance::FinalState),
            "empty" | "empty-stack" => Ok(Acceptance::EmptyStack),
            "either" => Ok(Acceptance::Either),
            "both" => Ok(Acceptance::Both),
            _ => Err(ConfigurationError::InvalidAcceptance(s.to_string())),
        }
    }
}

impl fmt::Display for Acceptance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Acceptance::FinalState => "final-state",
            Acceptance::EmptyStack => "empty-stack",
            Acceptance::Either => "either",
            Acceptance::Both => "both",
        };
        write!(f, "{}", name)
    }
}

/// List of possible errors when building a PDA
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// No states were declared
    NoStates,
    /// A state was declared twice
    DuplicateState(String),
    /// A state is referenced but not declared
    UnknownState(String),
    /// An input symbol is referenced but not in the input alphabet
    UnknownInputSymbol(String),
    /// A stack symbol is referenced but not in the stack alphabet
    UnknownStackSymbol(String),
    /// ε was listed as a member of an alphabet
    EpsilonInAlphabet,
    /// No start state was given
    MissingStartState,
    /// No start stack symbol was given
    MissingStartStack,
    /// The start stack symbol is not in the stack alphabet
    StartStackNotInAlphabet(String),
    /// Unknown acceptance policy name
    InvalidAcceptance(String),
}

impl std::fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::NoStates => write!(f, "Error: The PDA has no states!"),
            ConfigurationError::DuplicateState(state) => {
                write!(f, "Error: State {} is declared more than once!", state)
            }
            ConfigurationError::UnknownState(state) => {
                write!(f, "Error: State {} is not declared!", state)
            }
            ConfigurationError::UnknownInputSymbol(symbol) => {
                write!(f, "Error: {} is not in the input alphabet!", symbol)
            }
            ConfigurationError::UnknownStackSymbol(symbol) => {
                write!(f, "Error: {} is not in the stack alphabet!", symbol)
            }
            ConfigurationError::EpsilonInAlphabet => {
                write!(f, "Error: ε cannot be a member of an alphabet!")
            }
            ConfigurationError::MissingStartState => {
                write!(f, "Error: No start state provided!")
            }
            ConfigurationError::MissingStartStack => {
                write!(f, "Error: No start stack symbol provided!")
            }
            ConfigurationError::StartStackNotInAlphabet(symbol) => write!(
                f,
                "Error: Start stack symbol {} is not in the stack alphabet!",
                symbol
            ),
            ConfigurationError::InvalidAcceptance(name) => write!(
                f,
                "Error: Unknown acceptance policy {}, expected final-state | empty-stack | either | both",
                name
            ),
        }
    }
}

impl std::error::Error for ConfigurationError {}

#[derive(Debug, Clone)]
pub struct Pda {
    state_names: Vec<String>,
    state_ids: HashMap<String, usize>,
    input_alphabet: BTreeSet<Symbol>,
    stack_alphabet: BTreeSet<Symbol>,
    transitions: TransitionTable,
    start_state: usize,
    start_stack: Symbol,
    accept_states: BitVec<u8>,
    acceptance: Acceptance,
}

impl Pda {
    pub fn builder() -> PdaBuilder {
        PdaBuilder::new()
    }

    pub fn num_states(&self) -> usize {
        self.state_names.len()
    }

    pub fn state_name(&self, state: usize) -> &str {
        &self.state_names[state]
    }

    pub fn state_id(&self, name: &str) -> Option<usize> {
        self.state_ids.get(name).copied()
    }

    /// State names in id order
    pub fn state_names(&self) -> &[String] {
        &self.state_names
    }

    pub fn input_alphabet(&self) -> &BTreeSet<Symbol> {
        &self.input_alphabet
    }

    pub fn stack_alphabet(&self) -> &BTreeSet<Symbol> {
        &self.stack_alphabet
    }

    pub fn transitions(&self) -> &TransitionTable {
        &self.transitions
    }

    pub fn start_state(&self) -> usize {
        self.start_state
    }

    pub fn start_stack(&self) -> &Symbol {
        &self.start_stack
    }

    pub fn accept_states(&self) -> &BitVec<u8> {
        &self.accept_states
    }

    pub fn is_accept_state(&self, state: usize) -> bool {
        self.accept_states.get(state).map(|bit| *bit).unwrap_or(false)
    }

    pub fn acceptance(&self) -> Acceptance {
        self.acceptance
    }

    /// Same automaton with a different acceptance policy
    pub fn with_acceptance(mut self, acceptance: Acceptance) -> Self {
        self.acceptance = acceptance;
        self
    }

    pub fn is_deterministic(&self) -> bool {
        self.transitions.is_deterministic()
    }

    /// Split an input string into input symbols, preferring longer symbols
    pub fn tokenize(&self, input: &str) -> Option<Vec<Symbol>> {
        symbol::tokenize(input, &self.input_alphabet)
    }

    /// Does the configuration satisfy the acceptance policy? Input consumption is
    /// checked by the caller.
    pub fn is_accepting(&self, configuration: &Configuration) -> bool {
        self.acceptance.is_satisfied(
            self.is_accept_state(configuration.state),
            configuration.stack.is_empty(),
        )
    }

    /// Full non-deterministic acceptance test with the default search options
    pub fn accepts(&self, input: &str) -> bool {
        self.accepts_with(input, &SearchOptions::default())
    }

    pub fn accepts_with(&self, input: &str, options: &SearchOptions) -> bool {
        self.accepting_path_with(input, options).is_some()
    }

    /// Configurations along the first accepting path found, start to finish
    pub fn accepting_path(&self, input: &str) -> Option<Vec<Configuration>> {
        self.accepting_path_with(input, &SearchOptions::default())
    }

    pub fn accepting_path_with(
        &self,
        input: &str,
        options: &SearchOptions,
    ) -> Option<Vec<Configuration>> {
        let Some(symbols) = self.tokenize(input) else {
            tracing::debug!("input {:?} is not over the input alphabet, rejecting", input);
            return None;
        };
        engine::search(self, &symbols, options)
    }

    /// Accepting path for an input that is already split into symbols
    pub fn accepting_path_symbols(
        &self,
        input: &[Symbol],
        options: &SearchOptions,
    ) -> Option<Vec<Configuration>> {
        engine::search(self, input, options)
    }
}

/// Fluent builder for [`Pda`]
#[derive(Debug, Clone, Default)]
pub struct PdaBuilder {
    states: Vec<String>,
    input_alphabet: Vec<String>,
    stack_alphabet: Vec<String>,
    start_state: Option<String>,
    start_stack: Option<String>,
    accept_states: Vec<String>,
    acceptance: Acceptance,
    transitions: Vec<TransitionSpec>,
}

impl PdaBuilder {
    pub fn new() -> Self {
        PdaBuilder::default()
    }

    pub fn states<S: AsRef<str>>(mut self, states: &[S]) -> Self {
        self.states = states.iter().map(|s| s.as_ref().trim().to_string()).collect();
        self
    }

    pub fn input_alphabet<S: AsRef<str>>(mut self, symbols: &[S]) -> Self {
        self.input_alphabet = symbols.iter().map(|s| s.as_ref().trim().to_string()).collect();
        self
    }

    pub fn stack_alphabet<S: AsRef<str>>(mut self, symbols: &[S]) -> Self {
        self.stack_alphabet = symbols.iter().map(|s| s.as_ref().trim().to_string()).collect();
        self
    }

    pub fn start_state(mut self, state: &str) -> Self {
        self.start_state = Some(state.trim().to_string());
        self
    }

    pub fn start_stack(mut self, symbol: &str) -> Self {
        self.start_stack = Some(symbol.trim().to_string());
        self
    }

    pub fn accept_states<S: AsRef<str>>(mut self, states: &[S]) -> Self {
        self.accept_states = states.iter().map(|s| s.as_ref().trim().to_string()).collect();
        self
    }

    pub fn acceptance(mut self, acceptance: Acceptance) -> Self {
        self.acceptance = acceptance;
        self
    }

    /// Add `(from, input, top) -> (to, push)`, with `push` listed bottom to top
    pub fn transition(mut self, from: &str, input: &str, top: &str, to: &str, push: &[&str]) -> Self {
        self.transitions
            .push(TransitionSpec::new(from, input, top, to, push));
        self
    }

    pub fn transition_spec(mut self, spec: TransitionSpec) -> Self {
        self.transitions.push(spec);
        self
    }

    pub fn build(self) -> Result<Pda, ConfigurationError> {
        if self.states.is_empty() {
            return Err(ConfigurationError::NoStates);
        }

        let mut state_ids = HashMap::new();
        for (id, name) in self.states.iter().enumerate() {
            if state_ids.insert(name.clone(), id).is_some() {
                return Err(ConfigurationError::DuplicateState(name.clone()));
            }
        }

        let input_alphabet = collect_alphabet(&self.input_alphabet)?;
        let stack_alphabet = collect_alphabet(&self.stack_alphabet)?;

        let start_state = self
            .start_state
            .ok_or(ConfigurationError::MissingStartState)?;
        let start_state = *state_ids
            .get(&start_state)
            .ok_or(ConfigurationError::UnknownState(start_state))?;

        let start_stack = self
            .start_stack
            .ok_or(ConfigurationError::MissingStartStack)?;
        let start_stack = Symbol::new(start_stack);
        if !stack_alphabet.contains(&start_stack) {
            return Err(ConfigurationError::StartStackNotInAlphabet(
                start_stack.to_string(),
            ));
        }

        let mut accept_states = bitvec![u8, Lsb0; 0; self.states.len()];
        for name in &self.accept_states {
            let id = *state_ids
                .get(name)
                .ok_or_else(|| ConfigurationError::UnknownState(name.clone()))?;
            accept_states.set(id, true);
        }

        let transitions = TransitionTable::new(
            &self.transitions,
            &state_ids,
            &input_alphabet,
            &stack_alphabet,
        )?;

        Ok(Pda {
            state_names: self.states,
            state_ids,
            input_alphabet,
            stack_alphabet,
            transitions,
            start_state,
            start_stack,
            accept_states,
            acceptance: self.acceptance,
        })
    }
}

fn collect_alphabet(names: &[String]) -> Result<BTreeSet<Symbol>, ConfigurationError> {
    let mut alphabet = BTreeSet::new();
    for name in names {
        if name.is_empty() {
            continue;
        }
        if symbol::is_epsilon(name) {
            return Err(ConfigurationError::EpsilonInAlphabet);
        }
        alphabet.insert(Symbol::new(name.as_str()));
    }
    Ok(alphabet)
}

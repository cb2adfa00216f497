/* Execution engine. Two ways to run a PDA over an input:
 *
 * - `search` is the acceptance test. It explores every non-deterministic choice,
 *   input-consuming moves first and then ε-moves, depth first over an explicit stack of
 *   frames. Every frame owns its configuration, so siblings never see each other's
 *   stacks.
 * - `Simulator` walks a single path for visualization. At each step it fires the FIRST
 *   matching transition only and never backtracks, so it can reject inputs that
 *   `search` accepts. */

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, trace};

use crate::pda::Pda;
use crate::stack::PdaStack;
use crate::symbol::{Symbol, Trigger};
use crate::transition::Move;

pub const DEFAULT_MAX_EPSILON_RUN: usize = 256;

/// Bounds for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    /// Consecutive ε-moves allowed on one path before that path is given up
    pub max_epsilon_run: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            max_epsilon_run: DEFAULT_MAX_EPSILON_RUN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    Ready,
    Running,
    Accepted,
    Rejected,
}

impl RunStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, RunStatus::Accepted | RunStatus::Rejected)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStatus::Ready => "ready",
            RunStatus::Running => "running",
            RunStatus::Accepted => "accepted",
            RunStatus::Rejected => "rejected",
        };
        write!(f, "{}", name)
    }
}

/// Instantaneous description of a run. `position` indexes the input symbols.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Configuration {
    pub state: usize,
    pub stack: PdaStack,
    pub position: usize,
}

impl Configuration {
    pub fn initial(pda: &Pda) -> Self {
        Configuration {
            state: pda.start_state(),
            stack: PdaStack::new(pda.start_stack().clone()),
            position: 0,
        }
    }

    pub fn remaining<'i>(&self, input: &'i [Symbol]) -> &'i [Symbol] {
        input.get(self.position..).unwrap_or(&[])
    }

    /// The configuration after firing `target`; `self` is left untouched.
    pub fn apply(&self, target: &Move, consumes_input: bool) -> Configuration {
        let mut stack = self.stack.clone();
        stack.replace_top(&target.push);
        Configuration {
            state: target.next_state,
            stack,
            position: self.position + usize::from(consumes_input),
        }
    }

    pub fn snapshot(&self, pda: &Pda, input: &[Symbol], status: RunStatus) -> Snapshot {
        Snapshot {
            state: pda.state_name(self.state).to_string(),
            stack: self.stack.iter_top_down().map(Symbol::to_string).collect(),
            remaining: self.remaining(input).iter().map(Symbol::to_string).collect(),
            status,
        }
    }
}

/// What a renderer needs after each step, with names resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub state: String,
    /// Top first
    pub stack: Vec<String>,
    pub remaining: Vec<String>,
    pub status: RunStatus,
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let remaining = if self.remaining.is_empty() {
            "ε".to_string()
        } else {
            self.remaining.concat()
        };
        write!(f, "({}, {}, {})", self.state, remaining, self.stack.concat())
    }
}

struct Node {
    configuration: Configuration,
    parent: Option<usize>,
}

fn path_to(nodes: &[Node], mut index: usize) -> Vec<Configuration> {
    let mut path = vec![nodes[index].configuration.clone()];
    while let Some(parent) = nodes[index].parent {
        path.push(nodes[parent].configuration.clone());
        index = parent;
    }
    path.reverse();
    path
}

/// Visits to `next`'s (state, top) pair during the ε-run that ends in node `index`,
/// counting only those made at a stack height no greater than `next`'s
fn pumped_visits(nodes: &[Node], mut index: usize, epsilon_run: usize, next: &Configuration) -> usize {
    let mut visits = 0;
    for _ in 0..=epsilon_run {
        let earlier = &nodes[index].configuration;
        if earlier.state == next.state
            && earlier.stack.peek() == next.stack.peek()
            && earlier.stack.len() <= next.stack.len()
        {
            visits += 1;
        }
        match nodes[index].parent {
            Some(parent) => index = parent,
            None => break,
        }
    }
    visits
}

/// Exhaustive acceptance search. Returns the configurations along the first accepting
/// path found, or `None` if no path consumes the whole input and ends in a
/// configuration satisfying the acceptance policy.
///
/// A path dies once it has taken more than `max_epsilon_run` ε-moves in a row. A
/// configuration is only expanded again if it is reached with a shorter ε-run than
/// before, which also cuts off pure ε-cycles.
///
/// ε-loops that keep growing the stack never repeat a configuration, so an ε-run is
/// also cut when it returns to a (state, top) pair it already visited at the same or a
/// lower stack height more often than there are input symbols left to pop the extra
/// symbols with. Every new stack maximum needs a pair that has not used up its visits,
/// so the height an ε-run can reach is bounded by the number of (state, stack symbol)
/// pairs times the remaining input plus one.
pub(crate) fn search(pda: &Pda, input: &[Symbol], options: &SearchOptions) -> Option<Vec<Configuration>> {
    let start = Configuration::initial(pda);

    let mut best_epsilon_run: HashMap<Configuration, usize> = HashMap::new();
    best_epsilon_run.insert(start.clone(), 0);

    let mut nodes = vec![Node {
        configuration: start,
        parent: None,
    }];
    let mut frames: Vec<(usize, usize)> = vec![(0, 0)]; // (node, consecutive ε-moves)
    let mut explored = 0usize;

    while let Some((index, epsilon_run)) = frames.pop() {
        explored += 1;

        let configuration = &nodes[index].configuration;
        trace!(
            state = pda.state_name(configuration.state),
            position = configuration.position,
            stack = %configuration.stack,
            epsilon_run,
            "expanding configuration"
        );

        if configuration.position == input.len() && pda.is_accepting(configuration) {
            debug!(explored, "accepting path found");
            return Some(path_to(&nodes, index));
        }

        let top = configuration.stack.peek();
        let mut children: Vec<(Configuration, usize)> = Vec::new();

        if let Some(next) = input.get(configuration.position) {
            let trigger = Trigger::Input(next.clone());
            for target in pda.transitions().lookup(configuration.state, &trigger, top) {
                children.push((configuration.apply(target, true), 0));
            }
        }

        let epsilon_moves = pda
            .transitions()
            .lookup(configuration.state, &Trigger::Epsilon, top);
        if epsilon_run < options.max_epsilon_run {
            let remaining = input.len() - configuration.position;
            for target in epsilon_moves {
                let child = configuration.apply(target, false);
                if pumped_visits(&nodes, index, epsilon_run, &child) > remaining {
                    trace!(epsilon_run, "ε-run pumps the stack without reading, abandoning branch");
                    continue;
                }
                children.push((child, epsilon_run + 1));
            }
        } else if !epsilon_moves.is_empty() {
            trace!(epsilon_run, "ε-move bound reached, abandoning branch");
        }

        // reversed so the first candidate is expanded first
        for (child, run) in children.into_iter().rev() {
            if best_epsilon_run
                .get(&child)
                .is_some_and(|&seen| seen <= run)
            {
                continue;
            }
            best_epsilon_run.insert(child.clone(), run);
            nodes.push(Node {
                configuration: child,
                parent: Some(index),
            });
            frames.push((nodes.len() - 1, run));
        }
    }

    debug!(explored, "no accepting path");
    None
}

/// Incremental, single-path runner used to drive a visualization.
///
/// Each step takes the first transition listed for the current (state, trigger, top).
/// This does not backtrack: for non-deterministic automata the verdict it reaches may
/// differ from [`Pda::accepts`], which is the authoritative answer.
#[derive(Debug, Clone)]
pub struct Simulator<'a> {
    pda: &'a Pda,
    input: Vec<Symbol>,
    options: SearchOptions,
    configuration: Configuration,
    status: RunStatus,
    epsilon_run: usize,
    trace: Vec<Snapshot>,
}

impl<'a> Simulator<'a> {
    /// Input that is not over the input alphabet is still loaded, one symbol per
    /// character, and will simply never match a transition.
    pub fn new(pda: &'a Pda, input: &str) -> Self {
        let symbols = pda.tokenize(input).unwrap_or_else(|| {
            input
                .chars()
                .map(|ch| Symbol::new(ch.to_string()))
                .collect()
        });
        Simulator::with_symbols(pda, symbols)
    }

    pub fn with_symbols(pda: &'a Pda, input: Vec<Symbol>) -> Self {
        let configuration = Configuration::initial(pda);
        let mut simulator = Simulator {
            pda,
            input,
            options: SearchOptions::default(),
            configuration,
            status: RunStatus::Ready,
            epsilon_run: 0,
            trace: Vec::new(),
        };
        simulator.reset();
        simulator
    }

    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    /// Back to the start configuration with the whole input unread
    pub fn reset(&mut self) {
        self.configuration = Configuration::initial(self.pda);
        self.status = RunStatus::Ready;
        self.epsilon_run = 0;
        self.trace = vec![self.snapshot()];
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn input(&self) -> &[Symbol] {
        &self.input
    }

    pub fn remaining(&self) -> &[Symbol] {
        self.configuration.remaining(&self.input)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.configuration
            .snapshot(self.pda, &self.input, self.status)
    }

    /// Snapshots of every configuration visited since the last reset, oldest first
    pub fn trace(&self) -> &[Snapshot] {
        &self.trace
    }

    /// Fire the first transition matching `trigger` from the current configuration.
    /// An input trigger only fires if it is the next unread input symbol. Returns
    /// whether a transition fired; if not, nothing changed.
    pub fn step(&mut self, trigger: &Trigger) -> bool {
        if self.status.is_finished() {
            return false;
        }

        let consumes_input = match trigger {
            Trigger::Epsilon => false,
            Trigger::Input(symbol) => {
                if self.input.get(self.configuration.position) != Some(symbol) {
                    return false;
                }
                true
            }
        };

        let Some(target) = self
            .pda
            .transitions()
            .lookup(
                self.configuration.state,
                trigger,
                self.configuration.stack.peek(),
            )
            .first()
        else {
            return false;
        };

        let next = self.configuration.apply(target, consumes_input);
        debug!(
            from = self.pda.state_name(self.configuration.state),
            to = self.pda.state_name(next.state),
            %trigger,
            stack = %next.stack,
            "step"
        );

        self.configuration = next;
        self.status = RunStatus::Running;
        self.epsilon_run = if consumes_input { 0 } else { self.epsilon_run + 1 };
        self.trace.push(self.snapshot());
        true
    }

    /// One step of the automatic run: read the next input symbol if a transition
    /// allows it, otherwise take an ε-move. When neither is possible the run is
    /// decided: accepted if the input is consumed and the acceptance policy holds,
    /// rejected otherwise. Too many ε-moves in a row also rejects.
    pub fn advance(&mut self) -> RunStatus {
        if self.status.is_finished() {
            return self.status;
        }

        if let Some(next) = self.input.get(self.configuration.position).cloned() {
            if self.step(&Trigger::Input(next)) {
                return self.status;
            }
        }

        if self.epsilon_run < self.options.max_epsilon_run && self.step(&Trigger::Epsilon) {
            return self.status;
        }

        let accepted = self.remaining().is_empty() && self.pda.is_accepting(&self.configuration);
        self.finish(if accepted {
            RunStatus::Accepted
        } else {
            RunStatus::Rejected
        })
    }

    /// Advance until the run is decided
    pub fn run(&mut self) -> RunStatus {
        while !self.advance().is_finished() {}
        self.status
    }

    fn finish(&mut self, status: RunStatus) -> RunStatus {
        self.status = status;
        if let Some(last) = self.trace.last_mut() {
            last.status = status;
        }
        debug!(%status, "run finished");
        status
    }
}

/* Reading and writing PDA descriptions.
 *
 * Two formats are understood. JSON is a direct serialization of `PdaDescriptor`. The
 * text format is line oriented:
 *
 *     # a^n b^n
 *     states: q0, q1, q2
 *     input: a, b
 *     stack: A, $
 *     start: q0
 *     bottom: $
 *     accept: q2
 *     (q0, a, $) -> (q0, A$)
 *     (q0, b, A) -> (q1, ε)
 *
 * A `#` at the start of a line, or with whitespace on both sides, starts a comment.
 * Anywhere else it is an ordinary character.
 *
 * In the text format the push string is written the usual textbook way, leftmost
 * symbol on top, and is reversed on load. In JSON `push` is listed bottom to top. */

use color_eyre::eyre::{Report, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::pda::{Acceptance, ConfigurationError, Pda};
use crate::symbol::{self, Symbol};
use crate::transition::TransitionSpec;

/// A PDA described by names only, as found in a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdaDescriptor {
    pub states: Vec<String>,
    pub input_alphabet: Vec<String>,
    pub stack_alphabet: Vec<String>,
    pub start_state: String,
    pub start_stack: String,
    #[serde(default)]
    pub accept_states: Vec<String>,
    #[serde(default)]
    pub acceptance: Acceptance,
    #[serde(default)]
    pub transitions: Vec<TransitionSpec>,
}

impl Pda {
    pub fn from_descriptor(descriptor: &PdaDescriptor) -> Result<Pda, ConfigurationError> {
        descriptor
            .transitions
            .iter()
            .cloned()
            .fold(
                Pda::builder()
                    .states(&descriptor.states)
                    .input_alphabet(&descriptor.input_alphabet)
                    .stack_alphabet(&descriptor.stack_alphabet)
                    .start_state(&descriptor.start_state)
                    .start_stack(&descriptor.start_stack)
                    .accept_states(&descriptor.accept_states)
                    .acceptance(descriptor.acceptance),
                |builder, spec| builder.transition_spec(spec),
            )
            .build()
    }

    pub fn to_descriptor(&self) -> PdaDescriptor {
        let transitions = self
            .transitions()
            .iter()
            .map(|(from, trigger, top, target)| TransitionSpec {
                from: self.state_name(from).to_string(),
                input: trigger.to_string(),
                top: top.to_string(),
                to: self.state_name(target.next_state).to_string(),
                push: target.push.iter().map(Symbol::to_string).collect(),
            })
            .collect();

        let accept_states = self
            .accept_states()
            .iter_ones()
            .map(|state| self.state_name(state).to_string())
            .collect();

        PdaDescriptor {
            states: self.state_names().to_vec(),
            input_alphabet: self.input_alphabet().iter().map(Symbol::to_string).collect(),
            stack_alphabet: self.stack_alphabet().iter().map(Symbol::to_string).collect(),
            start_state: self.state_name(self.start_state()).to_string(),
            start_stack: self.start_stack().to_string(),
            accept_states,
            acceptance: self.acceptance(),
            transitions,
        }
    }
}

/// List of possible errors while loading a PDA description
#[derive(Debug, PartialEq, Eq)]
pub enum LoadError {
    /// Failed to open the file
    FileOpenError(String),
    /// Failed to read or write the file
    FileReadError(String),
    /// Invalid JSON description
    InvalidJson(String),
    /// A line that is neither a `key: value` item nor a transition
    MalformedLine(usize, String),
    /// A `key: value` item with an unknown key
    UnknownKey(usize, String),
    /// The same item was given twice
    DuplicateKey(usize, String),
    /// A required item never appeared
    MissingKey(&'static str),
    /// A push string that cannot be split into stack symbols
    InvalidPushString(usize, String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::FileOpenError(err_line) => write!(f, "{}", err_line),
            LoadError::FileReadError(err_line) => write!(f, "{}", err_line),
            LoadError::InvalidJson(err) => write!(f, "Error: Invalid PDA json: {}", err),
            LoadError::MalformedLine(line, content) => {
                write!(f, "Error: Malformed line {}: {}", line, content)
            }
            LoadError::UnknownKey(line, key) => write!(
                f,
                "Error: Unknown item {} on line {}, expected states | input | stack | start | bottom | accept | acceptance",
                key, line
            ),
            LoadError::DuplicateKey(line, key) => {
                write!(f, "Error: Item {} set again on line {}", key, line)
            }
            LoadError::MissingKey(key) => write!(f, "Error: Item {} was never set", key),
            LoadError::InvalidPushString(line, push) => write!(
                f,
                "Error: Push string {} on line {} is not made of stack symbols",
                push, line
            ),
        }
    }
}

impl std::error::Error for LoadError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    States,
    Input,
    Stack,
    Start,
    Bottom,
    Accept,
    Acceptance,
}

impl Key {
    fn parse(name: &str) -> Option<Key> {
        let key = match name.trim().to_ascii_lowercase().as_str() {
            "states" | "q" => Key::States,
            "input" | "sigma" | "σ" | "e" => Key::Input,
            "stack" | "gamma" | "γ" | "t" => Key::Stack,
            "start" | "initial" | "q0" => Key::Start,
            "bottom" | "start_stack" | "z0" => Key::Bottom,
            "accept" | "final" | "f" => Key::Accept,
            "acceptance" => Key::Acceptance,
            _ => return None,
        };
        Some(key)
    }

    fn name(&self) -> &'static str {
        match self {
            Key::States => "states",
            Key::Input => "input",
            Key::Stack => "stack",
            Key::Start => "start",
            Key::Bottom => "bottom",
            Key::Accept => "accept",
            Key::Acceptance => "acceptance",
        }
    }
}

struct RawTransition {
    line: usize,
    from: String,
    input: String,
    top: String,
    to: String,
    push: String,
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `(a, b, c)` -> ["a", "b", "c"], only the first `parts - 1` commas split
fn split_tuple(text: &str, parts: usize) -> Option<Vec<String>> {
    let inner = text.trim().strip_prefix('(')?.strip_suffix(')')?;
    let fields: Vec<String> = inner.splitn(parts, ',').map(|s| s.trim().to_string()).collect();
    if fields.len() != parts || fields.iter().take(parts - 1).any(String::is_empty) {
        return None;
    }
    Some(fields)
}

fn parse_transition(line: usize, text: &str) -> Option<RawTransition> {
    let (left, right) = text.split_once("->").or_else(|| text.split_once('→'))?;
    let left = split_tuple(left, 3)?;
    let right = split_tuple(right, 2)?;
    let [from, input, top]: [String; 3] = left.try_into().ok()?;
    let [to, push]: [String; 2] = right.try_into().ok()?;
    Some(RawTransition {
        line,
        from,
        input,
        top,
        to,
        push,
    })
}

/// Split a textbook push string (leftmost on top) into symbols, bottom to top
fn parse_push(raw: &RawTransition, stack_alphabet: &BTreeSet<Symbol>) -> Result<Vec<String>> {
    let text = raw.push.trim();
    if text.is_empty() || symbol::is_epsilon(text) {
        return Ok(Vec::new());
    }

    let symbols: Vec<String> = if text.contains(char::is_whitespace) {
        text.split_whitespace().map(str::to_string).collect()
    } else {
        symbol::tokenize(text, stack_alphabet)
            .ok_or_else(|| Report::new(LoadError::InvalidPushString(raw.line, text.to_string())))?
            .into_iter()
            .map(|s| s.to_string())
            .collect()
    };

    Ok(symbols.into_iter().rev().collect())
}

/// `#` opens a comment at the start of a line or with whitespace on both sides, so it
/// can still be used as a symbol, as in `bottom: #`.
fn strip_comment(line: &str) -> &str {
    let line = line.trim();
    if line.starts_with('#') {
        return "";
    }
    for (index, ch) in line.char_indices() {
        if ch != '#' {
            continue;
        }
        let before = line[..index].chars().next_back();
        let after = line[index + 1..].chars().next();
        if before.is_some_and(char::is_whitespace) && after.is_some_and(char::is_whitespace) {
            return line[..index].trim_end();
        }
    }
    line
}

/// Parse the line-oriented text format into a descriptor
pub fn parse_pda_text(text: &str) -> Result<PdaDescriptor> {
    let mut items: [Option<String>; 7] = Default::default();
    let mut raw_transitions = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        let content = strip_comment(line);
        if content.is_empty() {
            continue;
        }

        if content.starts_with('(') {
            let raw = parse_transition(line_number, content).ok_or_else(|| {
                Report::new(LoadError::MalformedLine(line_number, content.to_string()))
            })?;
            raw_transitions.push(raw);
            continue;
        }

        let Some((name, value)) = content.split_once(':').or_else(|| content.split_once('='))
        else {
            return Err(Report::new(LoadError::MalformedLine(
                line_number,
                content.to_string(),
            )));
        };

        let key = Key::parse(name)
            .ok_or_else(|| Report::new(LoadError::UnknownKey(line_number, name.trim().to_string())))?;
        let slot = &mut items[key as usize];
        if slot.is_some() {
            return Err(Report::new(LoadError::DuplicateKey(
                line_number,
                key.name().to_string(),
            )));
        }
        *slot = Some(value.trim().to_string());
    }

    let take = |items: &mut [Option<String>; 7], key: Key| items[key as usize].take();
    let require = |items: &mut [Option<String>; 7], key: Key| {
        take(items, key).ok_or_else(|| Report::new(LoadError::MissingKey(key.name())))
    };

    let states = split_list(&require(&mut items, Key::States)?);
    let input_alphabet = split_list(&require(&mut items, Key::Input)?);
    let stack_alphabet = split_list(&require(&mut items, Key::Stack)?);
    let start_state = require(&mut items, Key::Start)?;
    let start_stack = require(&mut items, Key::Bottom)?;
    let accept_states = take(&mut items, Key::Accept)
        .map(|value| split_list(&value))
        .unwrap_or_default();
    let acceptance = match take(&mut items, Key::Acceptance) {
        Some(value) => value.parse::<Acceptance>()?,
        None => Acceptance::default(),
    };

    let stack_symbols: BTreeSet<Symbol> = stack_alphabet
        .iter()
        .map(|s| Symbol::new(s.as_str()))
        .collect();

    let mut transitions = Vec::new();
    for raw in &raw_transitions {
        transitions.push(TransitionSpec {
            from: raw.from.clone(),
            input: raw.input.clone(),
            top: raw.top.clone(),
            to: raw.to.clone(),
            push: parse_push(raw, &stack_symbols)?,
        });
    }
    debug!(transitions = transitions.len(), "parsed PDA text");

    Ok(PdaDescriptor {
        states,
        input_alphabet,
        stack_alphabet,
        start_state,
        start_stack,
        accept_states,
        acceptance,
        transitions,
    })
}

/// Parse and build a PDA from the text format
pub fn load_pda_text(text: &str) -> Result<Pda> {
    let descriptor = parse_pda_text(text)?;
    Ok(Pda::from_descriptor(&descriptor)?)
}

/// Build a PDA from a JSON description
pub fn load_pda_json(json: &str) -> Result<Pda> {
    let descriptor: PdaDescriptor = serde_json::from_str(json)
        .map_err(|err| Report::new(LoadError::InvalidJson(err.to_string())))?;
    Ok(Pda::from_descriptor(&descriptor)?)
}

/// Read a PDA from a file. Files ending in `.json` are read as JSON, anything else as
/// the text format.
pub fn read_pda_file(file_path: &Path) -> Result<Pda> {
    let is_json = file_path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let pda = if is_json {
        let file = File::open(file_path).map_err(|err| {
            Report::new(LoadError::FileOpenError(format!(
                "Error: Failed to open PDA file {}: {}",
                file_path.display(),
                err
            )))
        })?;
        let descriptor: PdaDescriptor = serde_json::from_reader(BufReader::new(file))
            .map_err(|err| Report::new(LoadError::InvalidJson(err.to_string())))?;
        Pda::from_descriptor(&descriptor)?
    } else {
        let text = std::fs::read_to_string(file_path).map_err(|err| {
            Report::new(LoadError::FileReadError(format!(
                "Error: Failed to read PDA file {}: {}",
                file_path.display(),
                err
            )))
        })?;
        load_pda_text(&text)?
    };

    info!(
        file = %file_path.display(),
        states = pda.num_states(),
        transitions = pda.transitions().len(),
        "loaded PDA"
    );
    Ok(pda)
}

/// Save a PDA as pretty printed JSON
pub fn save_pda(pda: &Pda, file_path: &Path) -> Result<()> {
    let json_string = serde_json::to_string_pretty(&pda.to_descriptor())?;

    let mut file = File::create(file_path).map_err(|err| {
        Report::new(LoadError::FileOpenError(format!(
            "Error: Failed to create {}: {}",
            file_path.display(),
            err
        )))
    })?;

    writeln!(file, "{}", json_string)
        .map_err(|err| Report::new(LoadError::FileReadError(err.to_string())))?;
    Ok(())
}

#[cfg(test)]
mod loader_tests {
    use super::*;

    // a^n b^n, accepted in q2 once the marker is uncovered
    const GUI_DEFAULT: &str = "
        states: q0, q1, q2
        input: a, b
        stack: A, $
        start: q0
        bottom: $
        accept: q2
        (q0, a, $) -> (q0, A$)
        (q0, a, A) -> (q0, AA)
        (q0, b, A) -> (q1, ε)
        (q1, b, A) -> (q1, ε)
        (q1, ε, $) -> (q2, ε)
    ";

    #[test]
    fn test_parse_gui_default() {
        let descriptor = parse_pda_text(GUI_DEFAULT).unwrap();
        assert_eq!(descriptor.states, vec!["q0", "q1", "q2"]);
        assert_eq!(descriptor.start_stack, "$");
        assert_eq!(descriptor.acceptance, Acceptance::FinalState);
        assert_eq!(descriptor.transitions.len(), 5);
        // A$ is written top first and stored bottom first
        assert_eq!(descriptor.transitions[0].push, vec!["$", "A"]);
        assert!(descriptor.transitions[2].push.is_empty());
        assert_eq!(descriptor.transitions[4].input, "ε");

        let pda = Pda::from_descriptor(&descriptor).unwrap();
        assert!(pda.accepts("ab"));
        assert!(pda.accepts("aaabbb"));
        assert!(!pda.accepts("aab"));
        assert!(!pda.accepts(""));
    }

    #[test]
    fn test_comments_aliases_and_whitespace_push() {
        let text = "
            # balanced parentheses, accepted by empty stack
            Q = p
            sigma: (, )
            gamma: z0, P
            q0: p
            z0: z0
            acceptance: empty-stack
            (p, (, z0) -> (p, P z0)   # whitespace separated push
            (p, (, P) → (p, PP)
            (p, ), P) -> (p, eps)
        ";
        let pda = load_pda_text(text).unwrap();
        assert_eq!(pda.acceptance(), Acceptance::EmptyStack);
        assert!(pda.accepts("(()())"));
        assert!(!pda.accepts("(()"));
    }

    #[test]
    fn test_hash_as_bottom_marker() {
        let text = "
            # a^n b^n with # at the bottom
            states: q0, q1, q2
            input: a, b
            stack: A, #
            start: q0
            bottom: #
            accept: q2
            (q0, a, #) -> (q0, A#)   # first a
            (q0, a, A) -> (q0, AA)
            (q0, b, A) -> (q1, ε)
            (q1, b, A) -> (q1, ε)
            (q1, ε, #) -> (q2, #)
        ";
        let descriptor = parse_pda_text(text).unwrap();
        assert_eq!(descriptor.stack_alphabet, vec!["A", "#"]);
        assert_eq!(descriptor.start_stack, "#");
        assert_eq!(descriptor.transitions[0].top, "#");
        assert_eq!(descriptor.transitions[0].push, vec!["#", "A"]);

        let pda = Pda::from_descriptor(&descriptor).unwrap();
        assert!(pda.accepts("aabb"));
        assert!(!pda.accepts("abb"));
    }

    #[test]
    fn test_strip_comment() {
        assert_eq!(strip_comment("  # whole line"), "");
        assert_eq!(strip_comment("states: q0 # trailing"), "states: q0");
        assert_eq!(strip_comment("states: q0\t#\tafter a tab"), "states: q0");
        assert_eq!(strip_comment("bottom: #"), "bottom: #");
        assert_eq!(strip_comment("stack: #, A"), "stack: #, A");
        assert_eq!(strip_comment("(q0, a, #) -> (q0, A#)"), "(q0, a, #) -> (q0, A#)");
    }

    #[test]
    fn test_text_errors() {
        let err = parse_pda_text("states q0").unwrap_err();
        assert_eq!(
            err.downcast_ref::<LoadError>(),
            Some(&LoadError::MalformedLine(1, "states q0".to_string()))
        );

        let err = parse_pda_text("states: q0\ncolours: red").unwrap_err();
        assert_eq!(
            err.downcast_ref::<LoadError>(),
            Some(&LoadError::UnknownKey(2, "colours".to_string()))
        );

        let err = parse_pda_text("states: q0\nstates: q1").unwrap_err();
        assert_eq!(
            err.downcast_ref::<LoadError>(),
            Some(&LoadError::DuplicateKey(2, "states".to_string()))
        );

        let err = parse_pda_text("states: q0\ninput: a\nstack: $\nstart: q0").unwrap_err();
        assert_eq!(
            err.downcast_ref::<LoadError>(),
            Some(&LoadError::MissingKey("bottom"))
        );

        let err = parse_pda_text("(q0, a) -> (q0, A)").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LoadError>(),
            Some(LoadError::MalformedLine(1, _))
        ));

        let text = "states: q0\ninput: a\nstack: $\nstart: q0\nbottom: $\n(q0, a, $) -> (q0, XY)";
        let err = parse_pda_text(text).unwrap_err();
        assert_eq!(
            err.downcast_ref::<LoadError>(),
            Some(&LoadError::InvalidPushString(6, "XY".to_string()))
        );
    }

    #[test]
    fn test_configuration_errors_pass_through() {
        let text = "states: q0\ninput: a\nstack: $\nstart: q9\nbottom: $";
        let err = load_pda_text(text).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigurationError>(),
            Some(&ConfigurationError::UnknownState("q9".to_string()))
        );

        let text = "states: q0\ninput: a\nstack: $\nstart: q0\nbottom: $\nacceptance: sometimes";
        let err = parse_pda_text(text).unwrap_err();
        assert!(err.downcast_ref::<ConfigurationError>().is_some());
    }

    #[test]
    fn test_descriptor_json() {
        let pda = load_pda_text(GUI_DEFAULT).unwrap();
        let json = serde_json::to_string(&pda.to_descriptor()).unwrap();
        let reloaded = load_pda_json(&json).unwrap();

        assert_eq!(reloaded.to_descriptor(), pda.to_descriptor());
        for input in ["", "ab", "aabb", "ba", "abab"] {
            assert_eq!(reloaded.accepts(input), pda.accepts(input));
        }

        let err = load_pda_json("{ \"states\": [] ").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LoadError>(),
            Some(LoadError::InvalidJson(_))
        ));
    }
}

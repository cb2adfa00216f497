/* The PDA stack. The start stack symbol doubles as a permanent bottom marker: it is the
 * only content of a fresh stack and it can never be popped. "Empty" therefore means
 * "nothing above the marker". */

use std::fmt;

use crate::symbol::Symbol;

/// List of possible errors on the stack
#[derive(Debug, PartialEq, Eq)]
pub enum StackError {
    /// Tried to pop when only the bottom marker is left
    Empty,
}

impl std::fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackError::Empty => write!(f, "Error: Cannot pop the bottom marker of the stack!"),
        }
    }
}

impl std::error::Error for StackError {}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PdaStack {
    symbols: Vec<Symbol>, // symbols[0] is the bottom marker, the last entry is the top
}

impl PdaStack {
    /// Create a stack holding only the bottom marker
    pub fn new(bottom: Symbol) -> Self {
        PdaStack {
            symbols: vec![bottom],
        }
    }

    /// Push the symbols in order, so the last one ends up on top. ε entries are skipped.
    pub fn push(&mut self, symbols: &[Symbol]) {
        self.symbols
            .extend(symbols.iter().filter(|s| !s.is_epsilon()).cloned());
    }

    pub fn pop(&mut self) -> Result<Symbol, StackError> {
        if self.is_empty() {
            return Err(StackError::Empty);
        }
        self.symbols.pop().ok_or(StackError::Empty)
    }

    /// The top symbol. This is the bottom marker when nothing is above it.
    pub fn peek(&self) -> &Symbol {
        &self.symbols[self.symbols.len() - 1]
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.len() == 1
    }

    pub fn bottom(&self) -> &Symbol {
        &self.symbols[0]
    }

    /// Number of symbols including the bottom marker
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Pop the top and push `push` in its place. When the top is the bottom marker it
    /// stays where it is, and a leading copy of the marker in `push` is absorbed.
    pub fn replace_top(&mut self, push: &[Symbol]) {
        match self.pop() {
            Ok(_) => self.push(push),
            Err(StackError::Empty) => {
                let rest = match push.split_first() {
                    Some((first, rest)) if first == self.bottom() => rest,
                    _ => push,
                };
                self.push(rest);
            }
        }
    }

    /// Symbols from the top down to the bottom marker
    pub fn iter_top_down(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().rev()
    }
}

impl fmt::Display for PdaStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for symbol in self.iter_top_down() {
            write!(f, "{}", symbol)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod stack_tests {
    use super::*;
    use proptest::prelude::*;

    fn symbols(names: &[&str]) -> Vec<Symbol> {
        names.iter().map(|s| Symbol::from(*s)).collect()
    }

    #[test]
    fn test_fresh_stack() {
        let stack = PdaStack::new(Symbol::from("$"));
        assert!(stack.is_empty());
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.peek().as_str(), "$");
        assert_eq!(stack.bottom().as_str(), "$");
    }

    #[test]
    fn test_push_order_and_pop() {
        let mut stack = PdaStack::new(Symbol::from("$"));
        stack.push(&symbols(&["A", "B"]));
        assert_eq!(stack.peek().as_str(), "B");
        assert_eq!(stack.to_string(), "BA$");

        assert_eq!(stack.pop(), Ok(Symbol::from("B")));
        assert_eq!(stack.pop(), Ok(Symbol::from("A")));
        assert!(stack.is_empty());
        assert_eq!(stack.pop(), Err(StackError::Empty));
        assert_eq!(stack.peek().as_str(), "$");
    }

    #[test]
    fn test_push_epsilon_is_noop() {
        let mut stack = PdaStack::new(Symbol::from("$"));
        stack.push(&[]);
        stack.push(&symbols(&["ε"]));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_replace_top_above_marker() {
        let mut stack = PdaStack::new(Symbol::from("$"));
        stack.push(&symbols(&["A"]));
        stack.replace_top(&symbols(&["A", "A"]));
        assert_eq!(stack.to_string(), "AA$");
        stack.replace_top(&[]);
        assert_eq!(stack.to_string(), "A$");
    }

    #[test]
    fn test_replace_top_on_marker() {
        let mut stack = PdaStack::new(Symbol::from("$"));
        stack.replace_top(&symbols(&["$", "A"]));
        assert_eq!(stack.to_string(), "A$");

        let mut stack = PdaStack::new(Symbol::from("$"));
        stack.replace_top(&symbols(&["A"]));
        assert_eq!(stack.to_string(), "A$");

        let mut stack = PdaStack::new(Symbol::from("$"));
        stack.replace_top(&[]);
        assert!(stack.is_empty());
    }

    proptest! {
        #[test]
        fn prop_push_pop_inverse(pushes in proptest::collection::vec("[A-D]", 0..16), pops in 0usize..20) {
            let mut stack = PdaStack::new(Symbol::from("$"));
            stack.push(&pushes.iter().map(|s| Symbol::from(s.as_str())).collect::<Vec<_>>());
            for _ in 0..pops {
                let _ = stack.pop();
            }

            let before = stack.clone();
            if let Ok(top) = stack.pop() {
                stack.push(&[top]);
                prop_assert_eq!(stack.peek(), before.peek());
            }
            prop_assert_eq!(&stack, &before);
            prop_assert_eq!(stack.is_empty(), stack.len() == 1);
            prop_assert_eq!(stack.is_empty(), pops >= pushes.len());
        }
    }
}

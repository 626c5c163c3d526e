//! Execution context: variable scopes, visit history, the `it` reference,
//! if-chain state, the hidden-hook registry, and the random source.

use std::collections::HashMap;

use crate::document::{Continuation, NodeId};
use crate::error::EngineError;
use crate::story::StorySource;
use crate::value::Data;

pub struct Context {
    story: Box<dyn StorySource>,
    globals: HashMap<String, Data>,
    /// Innermost scope last; a fresh base scope is pushed at passage entry,
    /// loop bodies push temporary scopes on top.
    locals: Vec<HashMap<String, Data>>,
    it: Option<Data>,
    /// Outcome of the most recent `(if:)`/`(else-if:)`/`(unless:)`, read by
    /// `(else:)` and `(else-if:)`. Cleared at passage entry.
    last_condition: Option<bool>,
    history: Vec<String>,
    /// Re-render closures for hidden hooks, keyed by their placeholder node.
    hidden: HashMap<NodeId, Continuation>,
    rng: XorShift,
}

impl Context {
    pub fn new(story: Box<dyn StorySource>) -> Self {
        Context {
            story,
            globals: HashMap::new(),
            locals: vec![HashMap::new()],
            it: None,
            last_condition: None,
            history: Vec::new(),
            hidden: HashMap::new(),
            rng: XorShift::new(0x5eed),
        }
    }

    /// Reseed the random source, for deterministic runs.
    pub fn seed_random(&mut self, seed: u64) {
        self.rng = XorShift::new(seed);
    }

    pub fn story(&self) -> &dyn StorySource {
        self.story.as_ref()
    }

    /// Record entry into a passage: append to history, drop locals, the
    /// `it` reference, the if-chain state, and any stale hidden hooks.
    pub fn enter_passage(&mut self, name: &str) {
        self.history.push(name.to_string());
        self.locals.clear();
        self.locals.push(HashMap::new());
        self.it = None;
        self.last_condition = None;
        self.hidden.clear();
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Times the named passage appears in the history, the current visit
    /// included.
    pub fn visits(&self, name: &str) -> usize {
        self.history.iter().filter(|p| p == &name).count()
    }

    pub fn current_passage(&self) -> Option<&str> {
        self.history.last().map(String::as_str)
    }

    pub fn global(&self, name: &str) -> Result<Data, EngineError> {
        self.globals.get(name).cloned().ok_or_else(|| {
            EngineError::eval(format!("the variable ${name} has not been set"))
        })
    }

    pub fn set_global(&mut self, name: &str, value: Data) {
        self.globals.insert(name.to_string(), value);
    }

    /// Forget a global entirely, as `(move:)` does to its source.
    pub fn unset_global(&mut self, name: &str) {
        self.globals.remove(name);
    }

    pub fn local(&self, name: &str) -> Result<Data, EngineError> {
        for scope in self.locals.iter().rev() {
            if let Some(value) = scope.get(name) {
                return Ok(value.clone());
            }
        }
        Err(EngineError::eval(format!(
            "the temporary variable _{name} has not been set"
        )))
    }

    /// Assign a local in the innermost scope that already holds it, or the
    /// innermost scope outright.
    pub fn set_local(&mut self, name: &str, value: Data) {
        for scope in self.locals.iter_mut().rev() {
            if scope.contains_key(name) {
                scope.insert(name.to_string(), value);
                return;
            }
        }
        if let Some(scope) = self.locals.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }

    /// Bind a name in the innermost scope only, shadowing any outer slot.
    /// Loop variables and lambda parameters bind this way.
    pub fn bind_local(&mut self, name: &str, value: Data) {
        if let Some(scope) = self.locals.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }

    pub fn unset_local(&mut self, name: &str) {
        for scope in self.locals.iter_mut().rev() {
            if scope.remove(name).is_some() {
                return;
            }
        }
    }

    pub fn push_scope(&mut self) {
        self.locals.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        if self.locals.len() > 1 {
            self.locals.pop();
        }
    }

    pub fn it(&self) -> Option<&Data> {
        self.it.as_ref()
    }

    pub fn set_it(&mut self, value: Data) {
        self.it = Some(value);
    }

    pub fn last_condition(&self) -> Option<bool> {
        self.last_condition
    }

    pub fn set_last_condition(&mut self, outcome: bool) {
        self.last_condition = Some(outcome);
    }

    pub fn register_hidden(&mut self, node: NodeId, rerender: Continuation) {
        self.hidden.insert(node, rerender);
    }

    pub fn take_hidden(&mut self, node: NodeId) -> Option<Continuation> {
        self.hidden.remove(&node)
    }

    /// A uniform index in `0..n`. `n` must be nonzero.
    pub fn random_below(&mut self, n: usize) -> usize {
        (self.rng.next() % n as u64) as usize
    }

    /// A uniform integer in the inclusive range, either order of bounds.
    pub fn random_range(&mut self, a: i64, b: i64) -> i64 {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let span = (hi - lo) as u64 + 1;
        lo + (self.rng.next() % span) as i64
    }
}

/// Minimal xorshift64* generator. Not a statistics-grade source; it only
/// feeds `(random:)` and `(either:)` and must be seedable for tests.
struct XorShift {
    state: u64,
}

impl XorShift {
    fn new(seed: u64) -> Self {
        XorShift {
            state: seed | 1,
        }
    }

    fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x.wrapping_mul(0x2545_f491_4f6c_dd1d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::InMemoryStory;

    fn ctx() -> Context {
        Context::new(Box::new(InMemoryStory::single("")))
    }

    #[test]
    fn unset_globals_are_an_error() {
        let c = ctx();
        assert!(c.global("x").is_err());
    }

    #[test]
    fn globals_survive_passage_entry() {
        let mut c = ctx();
        c.set_global("x", Data::Number(1.0));
        c.enter_passage("A");
        assert_eq!(c.global("x").unwrap(), Data::Number(1.0));
    }

    #[test]
    fn locals_are_cleared_at_passage_entry() {
        let mut c = ctx();
        c.set_local("x", Data::Number(1.0));
        c.enter_passage("A");
        assert!(c.local("x").is_err());
    }

    #[test]
    fn scoped_locals_shadow_and_unwind() {
        let mut c = ctx();
        c.set_local("x", Data::Number(1.0));
        c.push_scope();
        c.set_local("y", Data::Number(2.0));
        assert_eq!(c.local("x").unwrap(), Data::Number(1.0));
        assert_eq!(c.local("y").unwrap(), Data::Number(2.0));
        c.pop_scope();
        assert!(c.local("y").is_err());
        // Assigning an outer name from an inner scope writes the outer slot.
        c.push_scope();
        c.set_local("x", Data::Number(9.0));
        c.pop_scope();
        assert_eq!(c.local("x").unwrap(), Data::Number(9.0));
    }

    #[test]
    fn bind_local_shadows_instead_of_overwriting() {
        let mut c = ctx();
        c.set_local("x", Data::Number(1.0));
        c.push_scope();
        c.bind_local("x", Data::Number(2.0));
        assert_eq!(c.local("x").unwrap(), Data::Number(2.0));
        c.pop_scope();
        assert_eq!(c.local("x").unwrap(), Data::Number(1.0));
    }

    #[test]
    fn visits_count_history_entries() {
        let mut c = ctx();
        c.enter_passage("A");
        c.enter_passage("B");
        c.enter_passage("A");
        assert_eq!(c.visits("A"), 2);
        assert_eq!(c.visits("B"), 1);
        assert_eq!(c.visits("C"), 0);
        assert_eq!(c.current_passage(), Some("A"));
    }

    #[test]
    fn seeded_random_is_deterministic() {
        let mut a = ctx();
        let mut b = ctx();
        a.seed_random(7);
        b.seed_random(7);
        for _ in 0..10 {
            assert_eq!(a.random_below(100), b.random_below(100));
        }
    }

    #[test]
    fn random_range_stays_in_bounds() {
        let mut c = ctx();
        c.seed_random(42);
        for _ in 0..50 {
            let n = c.random_range(1, 6);
            assert!((1..=6).contains(&n));
            let m = c.random_range(6, 1);
            assert!((1..=6).contains(&m));
        }
    }
}

//! Arena storage for counterexample tree nodes and proof obligations.

use harrier_logic::Cube;

/// Index of a node in a [`CexPool`]. Invalidated by
/// [`CexPool::clear`].
pub type CexHandle = usize;

/// A node of the abstract counterexample tree.
///
/// A node describes the arrow `s -> t` between two state cubes. A
/// resolved node either carries the `inputs` of a concrete one-step
/// edge or has both children, splitting the arrow across a midpoint
/// state; an unresolved node has neither. Nodes with `s == t` stay
/// bare: they are identity edges contributing no step.
#[derive(Debug, Clone)]
pub struct CexEntry {
    /// Source state cube, over the state variables.
    pub s_state: Cube,
    /// Target state cube, also over the state variables (unprimed).
    pub t_state: Cube,
    /// Input assignment of a concrete edge.
    pub inputs: Option<Cube>,
    /// Child representing `s -> u`.
    pub left: Option<CexHandle>,
    /// Child representing `u -> t`.
    pub right: Option<CexHandle>,
}

/// Bump arena of counterexample nodes, bulk-freed between outer
/// iterations of the verifier's main loop.
#[derive(Debug, Default)]
pub struct CexPool {
    entries: Vec<CexEntry>,
}

impl CexPool {
    pub fn new() -> Self {
        CexPool::default()
    }

    pub fn make(&mut self, s_state: Cube, t_state: Cube, inputs: Option<Cube>) -> CexHandle {
        self.entries.push(CexEntry {
            s_state,
            t_state,
            inputs,
            left: None,
            right: None,
        });
        self.entries.len() - 1
    }

    pub fn get(&self, handle: CexHandle) -> &CexEntry {
        &self.entries[handle]
    }

    pub fn get_mut(&mut self, handle: CexHandle) -> &mut CexEntry {
        &mut self.entries[handle]
    }

    /// Drops all nodes. Outstanding handles become invalid.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A request to decide whether the arrow of a counterexample node is
/// real at a given frame level.
///
/// The ordering is lexicographic with the level dominating, so
/// obligations queue lowest-level first if an implementation chooses a
/// priority queue over recursion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProofObligation {
    level: usize,
    handle: CexHandle,
}

impl ProofObligation {
    pub fn new(level: usize, handle: CexHandle) -> Self {
        ProofObligation { level, handle }
    }

    pub fn level(self) -> usize {
        self.level
    }

    pub fn handle(self) -> CexHandle {
        self.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harrier_logic::{Literal, VariableStore};

    fn cube(positive: bool) -> Cube {
        let mut store = VariableStore::new();
        let var = store.make_var();
        Cube::new(vec![Literal::with_polarity(var, positive)])
    }

    #[test]
    fn handles_are_stable_until_clear() {
        let mut pool = CexPool::new();
        let a = pool.make(cube(true), cube(false), None);
        let b = pool.make(cube(false), cube(true), None);

        assert_ne!(a, b);
        assert_eq!(pool.get(a).s_state, cube(true));
        assert_eq!(pool.get(b).s_state, cube(false));

        pool.get_mut(a).left = Some(b);
        assert_eq!(pool.get(a).left, Some(b));

        pool.clear();
        assert!(pool.is_empty());
    }

    #[test]
    fn obligations_order_by_level_first() {
        let low = ProofObligation::new(1, 100);
        let high = ProofObligation::new(2, 0);
        let sibling = ProofObligation::new(1, 101);

        assert!(low < high);
        assert!(low < sibling);
        assert!(sibling < high);
    }
}

//! Variables, contiguous variable ranges, and the monotone variable store.

use serde::Serialize;

/// A propositional variable backed by a positive integer id.
///
/// Variables are only ever handed out by a [`VariableStore`], so two
/// variables with the same id always denote the same circuit node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Variable(i32);

impl Variable {
    pub(crate) fn new(id: i32) -> Self {
        debug_assert!(id > 0);
        Variable(id)
    }

    #[inline]
    pub fn id(self) -> i32 {
        self.0
    }
}

/// A contiguous, half-open range `[begin, end)` of variable ids.
///
/// Ranges come out of [`VariableStore::make_range`] and support O(1)
/// indexing in both directions: `offset(nth(i)) == i` for all
/// `i < size()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableRange {
    begin: i32,
    end: i32,
}

impl VariableRange {
    fn new(begin: i32, end: i32) -> Self {
        debug_assert!(begin > 0);
        debug_assert!(begin <= end);
        VariableRange { begin, end }
    }

    #[inline]
    pub fn size(self) -> usize {
        (self.end - self.begin) as usize
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.begin == self.end
    }

    #[inline]
    pub fn contains(self, var: Variable) -> bool {
        self.begin <= var.id() && var.id() < self.end
    }

    /// The `n`-th variable of the range.
    #[inline]
    pub fn nth(self, n: usize) -> Variable {
        let var = Variable::new(self.begin + n as i32);
        debug_assert!(self.contains(var));
        var
    }

    /// The position of `var` within the range.
    #[inline]
    pub fn offset(self, var: Variable) -> usize {
        debug_assert!(self.contains(var));
        (var.id() - self.begin) as usize
    }

    pub fn iter(self) -> impl DoubleEndedIterator<Item = Variable> + ExactSizeIterator {
        (self.begin..self.end).map(Variable::new)
    }
}

impl IntoIterator for VariableRange {
    type Item = Variable;
    type IntoIter = std::vec::IntoIter<Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter().collect::<Vec<_>>().into_iter()
    }
}

/// Allocates fresh variables with monotonically increasing ids.
#[derive(Debug)]
pub struct VariableStore {
    next_id: i32,
}

impl VariableStore {
    pub fn new() -> Self {
        VariableStore { next_id: 1 }
    }

    pub fn make_var(&mut self) -> Variable {
        let var = Variable::new(self.next_id);
        self.next_id += 1;
        var
    }

    pub fn make_range(&mut self, n: usize) -> VariableRange {
        let begin = self.next_id;
        self.next_id += n as i32;
        VariableRange::new(begin, self.next_id)
    }
}

impl Default for VariableStore {
    fn default() -> Self {
        Self::new()
    }
}

//! Aggregation of stack samples into a call tree
//!
//! Each node counts how many samples passed through its frame at that
//! position in the call graph.
//!
//! ```text
//! Total samples: 4
//! 3 main
//!   2 foo
//!     1 bar
//!     1 baz
//!   1 parse
//!     1 strlen
//! 1 __start
//! ```

use std::collections::HashMap;
use std::fmt;

use super::stacks::Stack;

/// A frame and the frames it called
#[derive(Debug, Clone, Default)]
pub struct StackNode {
    pub name: String,
    pub count: usize,
    children: Vec<StackNode>,
    index: HashMap<String, usize>,
}

impl StackNode {
    fn new(name: &str) -> Self {
        Self { name: name.to_string(), ..Self::default() }
    }

    /// Children in the order they were first seen
    #[must_use]
    pub fn children(&self) -> &[StackNode] {
        &self.children
    }

    #[must_use]
    pub fn child(&self, name: &str) -> Option<&StackNode> {
        self.index.get(name).map(|&i| &self.children[i])
    }

    fn child_mut(&mut self, name: &str) -> &mut StackNode {
        let i = match self.index.get(name) {
            Some(&i) => i,
            None => {
                self.children.push(StackNode::new(name));
                self.index.insert(name.to_string(), self.children.len() - 1);
                self.children.len() - 1
            }
        };
        &mut self.children[i]
    }

    fn write_lines(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{}{} {}", "  ".repeat(depth), self.count, self.name)?;
        self.children.iter().try_for_each(|child| child.write_lines(f, depth + 1))
    }
}

/// Call tree over a set of root-first stacks
#[derive(Debug, Clone, Default)]
pub struct CallTree {
    root: StackNode,
}

impl CallTree {
    /// Build the tree; each stack lists the outermost caller first
    #[must_use]
    pub fn aggregate(stacks: &[Stack]) -> Self {
        let mut root = StackNode::default();

        for stack in stacks {
            root.count += 1;
            let mut current = &mut root;
            for frame in stack {
                current = current.child_mut(frame);
                current.count += 1;
            }
        }

        Self { root }
    }

    /// Unnamed root; its count is the number of stacks aggregated
    #[must_use]
    pub fn root(&self) -> &StackNode {
        &self.root
    }

    /// Sum of the top-level frame counts
    ///
    /// Differs from the root count only when empty stacks were aggregated.
    #[must_use]
    pub fn total_samples(&self) -> usize {
        self.root.children.iter().map(|c| c.count).sum()
    }

    /// Render the tree, two spaces of indent per level below the top frames
    #[must_use]
    pub fn display(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CallTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total samples: {}", self.total_samples())?;
        self.root.children.iter().try_for_each(|child| child.write_lines(f, 0))
    }
}

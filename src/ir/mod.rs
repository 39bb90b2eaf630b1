//! The schedule IR that auto-generated rules inspect and mutate.
//!
//! A [`ModuleExpr`] holds one statement tree per lowered function. Statements
//! live in an arena and are addressed by [`StmtId`]. The tree shape is kept in
//! two separate tables: `uses` (parent to ordered children) and `used_by`
//! (child to parent). Nothing stops a caller from linking statements into a
//! malformed shape; [`ModuleExpr::validate`] is what rejects it.

pub mod attr;
pub mod expr;

use crate::error::{
    CyclicStmtSnafu, DanglingStmtSnafu, ParentMismatchSnafu, Result, SharedStmtSnafu,
};
use attr::AttrStore;
use expr::ComputeExpr;
use itertools::Itertools;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StmtId(usize);

impl From<usize> for StmtId {
    fn from(index: usize) -> Self {
        StmtId(index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForKind {
    Serial,
    Parallel,
    Vectorized,
    Unrolled,
    GpuBlock,
    GpuThread,
}

impl ForKind {
    /// Whether the loop is already mapped onto a parallel or vector construct.
    pub fn is_bound(self) -> bool {
        match self {
            ForKind::Parallel | ForKind::Vectorized | ForKind::GpuBlock | ForKind::GpuThread => {
                true
            }
            ForKind::Serial | ForKind::Unrolled => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterVarKind {
    Spatial,
    Reduce,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterVar {
    pub name: String,
    pub extent: usize,
    pub kind: IterVarKind,
}

impl IterVar {
    pub fn spatial(name: &str, extent: usize) -> Self {
        IterVar {
            name: name.to_string(),
            extent,
            kind: IterVarKind::Spatial,
        }
    }

    pub fn reduce(name: &str, extent: usize) -> Self {
        IterVar {
            name: name.to_string(),
            extent,
            kind: IterVarKind::Reduce,
        }
    }
}

/// A leaf unit of computation: `name[iter_vars] = body`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleBlock {
    pub name: String,
    pub iter_vars: Vec<IterVar>,
    pub body: ComputeExpr,
    pub attrs: AttrStore,
}

impl ScheduleBlock {
    pub fn new(name: &str, iter_vars: Vec<IterVar>, body: ComputeExpr) -> Self {
        ScheduleBlock {
            name: name.to_string(),
            iter_vars,
            body,
            attrs: AttrStore::new(),
        }
    }

    pub fn reduce_iter_vars(&self) -> impl Iterator<Item = &IterVar> {
        self.iter_vars
            .iter()
            .filter(|iv| iv.kind == IterVarKind::Reduce)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// An ordered sequence of child statements.
    Block,
    For {
        loop_var: String,
        extent: usize,
        kind: ForKind,
    },
    /// Binds `block`'s iteration variables to the enclosing loop variables,
    /// one entry of `iter_values` per iter var.
    ScheduleBlockRealize {
        iter_values: Vec<String>,
        block: ScheduleBlock,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ModuleExpr {
    stmts: Vec<Stmt>,
    uses: Vec<Vec<StmtId>>,
    used_by: Vec<Option<StmtId>>,
    roots: Vec<StmtId>,
    revision: u64,
}

#[derive(Clone, Copy, PartialEq)]
enum Visit {
    Unvisited,
    OnStack,
    Done,
}

impl ModuleExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_stmts(&self) -> usize {
        self.stmts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Incremented by every mutation. Rules compare it against the value seen
    /// at `init` to detect modification in between.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn contains(&self, id: StmtId) -> bool {
        id.0 < self.stmts.len()
    }

    pub fn add_stmt(&mut self, stmt: Stmt) -> StmtId {
        self.revision += 1;
        self.stmts.push(stmt);
        self.uses.push(vec![]);
        self.used_by.push(None);
        StmtId(self.stmts.len() - 1)
    }

    /// Appends `child` to `parent`'s children. The link is not checked:
    /// `child` may be missing from the arena or already have a parent.
    pub fn link(&mut self, parent: StmtId, child: StmtId) {
        assert!(self.contains(parent), "no statement {:?}", parent);
        self.revision += 1;
        self.uses[parent.0].push(child);
        if self.contains(child) && self.used_by[child.0].is_none() {
            self.used_by[child.0] = Some(parent);
        }
    }

    pub fn push_root(&mut self, root: StmtId) {
        self.revision += 1;
        self.roots.push(root);
    }

    pub fn roots(&self) -> &[StmtId] {
        &self.roots
    }

    pub fn children(&self, id: StmtId) -> &[StmtId] {
        &self.uses[id.0]
    }

    pub fn parent(&self, id: StmtId) -> Option<StmtId> {
        self.used_by[id.0]
    }

    pub fn schedule_block(&self, id: StmtId) -> Option<&ScheduleBlock> {
        match self.stmts.get(id.0) {
            Some(Stmt::ScheduleBlockRealize { block, .. }) => Some(block),
            _ => None,
        }
    }

    pub fn schedule_block_mut(&mut self, id: StmtId) -> Option<&mut ScheduleBlock> {
        match self.stmts.get_mut(id.0) {
            Some(Stmt::ScheduleBlockRealize { block, .. }) => {
                self.revision += 1;
                Some(block)
            }
            _ => None,
        }
    }

    /// Re-binds a loop, e.g. after an external pass parallelizes it.
    pub fn set_for_kind(&mut self, id: StmtId, new_kind: ForKind) {
        match self.stmts.get_mut(id.0) {
            Some(Stmt::For { kind, .. }) => {
                self.revision += 1;
                *kind = new_kind;
            }
            other => panic!("{:?} is not a loop: {:?}", id, other),
        }
    }

    /// Adds a function body computing `blocks` in order, each under its own
    /// serial loop nest: one loop per iter var, spatial loops outside reduce
    /// loops. Returns the new root.
    pub fn add_function(&mut self, blocks: Vec<ScheduleBlock>) -> StmtId {
        let root = self.add_stmt(Stmt::Block);
        for block in blocks {
            let loop_order = block
                .iter_vars
                .iter()
                .filter(|iv| iv.kind == IterVarKind::Spatial)
                .chain(block.reduce_iter_vars())
                .cloned()
                .collect::<Vec<_>>();

            let mut parent = root;
            for iv in loop_order {
                let for_id = self.add_stmt(Stmt::For {
                    loop_var: iv.name,
                    extent: iv.extent,
                    kind: ForKind::Serial,
                });
                self.link(parent, for_id);
                parent = for_id;
            }

            let iter_values = block.iter_vars.iter().map(|iv| iv.name.clone()).collect();
            let realize = self.add_stmt(Stmt::ScheduleBlockRealize { iter_values, block });
            self.link(parent, realize);
        }
        self.push_root(root);
        root
    }

    /// Checks that the statements reachable from the roots form a forest:
    /// every reference resolves, nothing is its own ancestor, nothing has two
    /// parents, and the `used_by` table agrees with `uses`.
    pub fn validate(&self) -> Result<()> {
        let mut state = vec![Visit::Unvisited; self.stmts.len()];
        for &root in &self.roots {
            if !self.contains(root) {
                return DanglingStmtSnafu {
                    parent: None::<StmtId>,
                    child: root.0,
                }
                .fail();
            }
            if state[root.0] != Visit::Unvisited {
                return SharedStmtSnafu { stmt: root }.fail();
            }
            if self.used_by[root.0].is_some() {
                return ParentMismatchSnafu {
                    stmt: root,
                    expected: None::<StmtId>,
                    found: self.used_by[root.0],
                }
                .fail();
            }
            self.validate_from(root, &mut state)?;
        }
        Ok(())
    }

    fn validate_from(&self, root: StmtId, state: &mut [Visit]) -> Result<()> {
        // (statement, index of the next child to visit)
        let mut stack = vec![(root, 0)];
        state[root.0] = Visit::OnStack;
        while let Some(top) = stack.last_mut() {
            let (id, next) = *top;
            top.1 += 1;
            let child = match self.uses[id.0].get(next) {
                Some(&child) => child,
                None => {
                    state[id.0] = Visit::Done;
                    stack.pop();
                    continue;
                }
            };

            if !self.contains(child) {
                return DanglingStmtSnafu {
                    parent: Some(id),
                    child: child.0,
                }
                .fail();
            }
            match state[child.0] {
                Visit::OnStack => return CyclicStmtSnafu { stmt: child }.fail(),
                Visit::Done => return SharedStmtSnafu { stmt: child }.fail(),
                Visit::Unvisited => {
                    if self.used_by[child.0] != Some(id) {
                        return ParentMismatchSnafu {
                            stmt: child,
                            expected: Some(id),
                            found: self.used_by[child.0],
                        }
                        .fail();
                    }
                    state[child.0] = Visit::OnStack;
                    stack.push((child, 0));
                }
            }
        }
        Ok(())
    }

    /// All schedule block realizes, in pre-order over the functions in order.
    pub fn schedule_block_realizes(&self) -> Result<Vec<StmtId>> {
        self.validate()?;
        let mut found = vec![];
        let mut stack: Vec<StmtId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if let Stmt::ScheduleBlockRealize { .. } = self[id] {
                found.push(id);
            }
            stack.extend(self.uses[id.0].iter().rev());
        }
        Ok(found)
    }

    /// The `For` statements enclosing `id`, innermost first. Assumes a
    /// validated module.
    pub fn enclosing_loops(&self, id: StmtId) -> Vec<StmtId> {
        let mut loops = vec![];
        let mut steps = 0;
        let mut current = self.used_by[id.0];
        while let Some(ancestor) = current {
            steps += 1;
            assert!(
                steps <= self.stmts.len(),
                "parent chain of {:?} does not terminate",
                id
            );
            if let Stmt::For { .. } = self[ancestor] {
                loops.push(ancestor);
            }
            current = self.used_by[ancestor.0];
        }
        loops
    }

    fn fmt_open(&self, f: &mut fmt::Formatter<'_>, id: StmtId, pad: &str) -> fmt::Result {
        match &self[id] {
            Stmt::Block => writeln!(f, "{}{{", pad),
            Stmt::For {
                loop_var,
                extent,
                kind,
            } => writeln!(f, "{}for {} in 0..{} ({:?}) {{", pad, loop_var, extent, kind),
            Stmt::ScheduleBlockRealize { iter_values, block } => {
                writeln!(
                    f,
                    "{}schedule_block {}[{}] <- [{}] {}",
                    pad,
                    block.name,
                    block
                        .iter_vars
                        .iter()
                        .map(|iv| match iv.kind {
                            IterVarKind::Spatial => format!("{}: {}", iv.name, iv.extent),
                            IterVarKind::Reduce => format!("{}: {} (reduce)", iv.name, iv.extent),
                        })
                        .join(", "),
                    iter_values.join(", "),
                    block.attrs.to_json()
                )?;
                writeln!(f, "{}  {}", pad, block.body)
            }
        }
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, root: StmtId) -> fmt::Result {
        enum Step {
            Open(StmtId, usize),
            Close(usize),
        }

        let mut stack = vec![Step::Open(root, 0)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Open(id, indent) => {
                    self.fmt_open(f, id, &"  ".repeat(indent))?;
                    if let Stmt::Block | Stmt::For { .. } = self[id] {
                        stack.push(Step::Close(indent));
                    }
                    stack.extend(
                        self.uses[id.0]
                            .iter()
                            .rev()
                            .map(|&child| Step::Open(child, indent + 1)),
                    );
                }
                Step::Close(indent) => writeln!(f, "{}}}", "  ".repeat(indent))?,
            }
        }
        Ok(())
    }
}

impl std::ops::Index<StmtId> for ModuleExpr {
    type Output = Stmt;

    fn index(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.0]
    }
}

impl fmt::Display for ModuleExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Err(e) = self.validate() {
            return write!(f, "<{}>", e);
        }
        for &root in &self.roots {
            self.fmt_tree(f, root)?;
        }
        Ok(())
    }
}

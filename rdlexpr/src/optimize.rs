//! Constant folding.
//!
//! [`optimize`] runs once per tree, before the first row is evaluated, and
//! freezes the result into a [`CompiledExpr`] which can then be shared by any
//! number of workers without locking.
//!
//! Folding is pure and idempotent, never changes the declared kind of a node
//! and never raises: a constant subtree whose evaluation fails is left
//! unfolded so the failure surfaces on the first real evaluation.
use std::{
    fmt,
    ops::Deref,
    sync::{Arc, LazyLock},
};

use log::debug;

use crate::{
    context::{ReportContext, Row},
    expr::Expr,
};

/// Constant subtrees hold no references, so nothing bound here is ever read.
static FOLD_CONTEXT: LazyLock<ReportContext> = LazyLock::new(ReportContext::detached);

/// Context constant subtrees are evaluated against while folding.
pub(crate) fn fold_context() -> &'static ReportContext {
    &FOLD_CONTEXT
}

/// Evaluates a constant subtree, keeping the node when evaluation fails.
pub(crate) fn fold_constant(node: Expr) -> Expr {
    match node.eval(fold_context(), &Row::empty()) {
        Ok(value) => Expr::Constant(value),
        Err(err) => {
            debug!("Keeping `{}` unfolded: {}", node, err);
            node
        }
    }
}

impl Expr {
    /// Returns the folded form of the tree.
    pub fn fold(self) -> Expr {
        match self {
            Expr::Binary(node) => node.fold(),
            Expr::Unary(node) => node.fold(),
            Expr::Logical(node) => node.fold(),
            Expr::Switch(node) => node.fold(),
            Expr::Iif(node) => node.fold(),
            Expr::Convert(node) => node.fold(),
            leaf @ (Expr::Constant(_)
            | Expr::Field(_)
            | Expr::Parameter(_)
            | Expr::Global(_)
            | Expr::Aggregate(_)) => leaf,
        }
    }
}

/// Size of a tree before and after folding.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FoldStats {
    pub nodes_before: usize,
    pub nodes_after: usize,
}

impl FoldStats {
    /// Number of nodes removed by folding.
    pub fn removed(&self) -> usize {
        self.nodes_before.saturating_sub(self.nodes_after)
    }
}

impl std::ops::AddAssign for FoldStats {
    fn add_assign(&mut self, rhs: Self) {
        self.nodes_before += rhs.nodes_before;
        self.nodes_after += rhs.nodes_after;
    }
}

/// A folded, immutable tree. Cloning shares the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr(Arc<Expr>);

impl CompiledExpr {
    pub fn as_expr(&self) -> &Expr {
        &self.0
    }
}

impl Deref for CompiledExpr {
    type Target = Expr;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for CompiledExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Folds `expr` and freezes it.
pub fn optimize(expr: Expr) -> (CompiledExpr, FoldStats) {
    let nodes_before = expr.node_count();
    let folded = expr.fold();
    let stats = FoldStats {
        nodes_before,
        nodes_after: folded.node_count(),
    };

    debug!(
        "Folded {} node(s) into {} ({} removed): {}",
        stats.nodes_before,
        stats.nodes_after,
        stats.removed(),
        folded
    );

    (CompiledExpr(Arc::new(folded)), stats)
}

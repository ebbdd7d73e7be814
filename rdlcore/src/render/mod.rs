//! Row-by-row rendering of a report definition.
//!
//! A [`RenderJob`] is prepared once per definition: every expression tree is
//! folded and frozen. Running the job then goes through three stages:
//!
//! 1. aggregates are accumulated over all rows and published in the
//!    [`ReportContext`] (`aggregate`)
//! 2. cells are evaluated on worker threads, row order is preserved
//!    (`worker`)
//! 3. custom report items are driven row by row on the calling thread
//!    (`items`)
//!
//! A failing cell or item never aborts the job; only cancellation does.
use std::fmt;

use log::info;
use rdlexpr::{
    Expr, Value,
    aggregate::AggregateFn,
    context::{ReportContext, Row, Schema},
    optimize::{CompiledExpr, FoldStats, optimize},
};
use strum::EnumIs;

use crate::{
    base::meta::RenderSettings,
    item::{CustomItemRegistry, Surface},
    utils::error::{RdlError, RdlResult},
};

mod aggregate;
mod items;
mod worker;

/// A named expression evaluated for every row.
#[derive(Debug, Clone)]
pub struct CellDef {
    pub name: String,
    pub expr: Expr,
}

/// An aggregate computed over every row before cells are evaluated.
/// Trees refer to it through `Aggregates!name`.
#[derive(Debug, Clone)]
pub struct AggregateDef {
    pub name: String,
    pub func: AggregateFn,
    pub expr: Expr,
}

/// A custom report item placed in the report.
#[derive(Debug, Clone)]
pub struct CustomItemDef {
    pub name: String,
    /// Registered type name of the item.
    pub type_name: String,
    pub properties: Vec<(String, Expr)>,
    pub width: u32,
    pub height: u32,
}

impl CustomItemDef {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            properties: Vec::new(),
            width,
            height,
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, expr: Expr) -> Self {
        self.properties.push((name.into(), expr));
        self
    }
}

/// Bound expression trees of a report, as handed over by the tree producer.
#[derive(Debug, Clone)]
pub struct ReportDefinition {
    pub name: String,
    pub schema: Schema,
    pub cells: Vec<CellDef>,
    pub aggregates: Vec<AggregateDef>,
    pub custom_items: Vec<CustomItemDef>,
}

impl ReportDefinition {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            cells: Vec::new(),
            aggregates: Vec::new(),
            custom_items: Vec::new(),
        }
    }

    pub fn with_cell(mut self, name: impl Into<String>, expr: Expr) -> Self {
        self.cells.push(CellDef {
            name: name.into(),
            expr,
        });
        self
    }

    pub fn with_aggregate(mut self, name: impl Into<String>, func: AggregateFn, expr: Expr) -> Self {
        self.aggregates.push(AggregateDef {
            name: name.into(),
            func,
            expr,
        });
        self
    }

    pub fn with_custom_item(mut self, item: CustomItemDef) -> Self {
        self.custom_items.push(item);
        self
    }
}

/// Result of one cell.
#[derive(Debug, Clone, PartialEq, EnumIs)]
pub enum CellValue {
    Value(Value),
    /// Evaluation failed; `marker` is shown in place of the value.
    Error { marker: String, message: String },
}

impl CellValue {
    pub fn value(&self) -> Option<&Value> {
        match self {
            CellValue::Value(value) => Some(value),
            CellValue::Error { .. } => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Value(value) => write!(f, "{}", value),
            CellValue::Error { marker, .. } => f.write_str(marker),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRow {
    pub position: usize,
    pub cells: Vec<CellValue>,
}

/// Output of one custom item call sequence.
#[derive(Debug, Clone, PartialEq, EnumIs)]
pub enum ItemFrame {
    Image { row: usize, surface: Surface },
    /// The item failed (or could not be created) and was released.
    Failed { row: Option<usize>, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemOutput {
    pub name: String,
    pub frames: Vec<ItemFrame>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    pub rows: Vec<RenderedRow>,
    pub items: Vec<ItemOutput>,
}

impl RenderOutput {
    /// Cells as displayed, row by row.
    pub fn display_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.cells.iter().map(CellValue::to_string).collect())
            .collect()
    }
}

struct CompiledAggregate {
    name: String,
    func: AggregateFn,
    expr: CompiledExpr,
}

struct CompiledItem {
    name: String,
    type_name: String,
    properties: Vec<(String, CompiledExpr)>,
    width: u32,
    height: u32,
}

/// A report definition whose trees are folded and frozen.
pub struct RenderJob {
    name: String,
    schema: Schema,
    cells: Vec<(String, CompiledExpr)>,
    aggregates: Vec<CompiledAggregate>,
    custom_items: Vec<CompiledItem>,
    settings: RenderSettings,
    stats: FoldStats,
}

impl RenderJob {
    pub fn prepare(definition: ReportDefinition, settings: &RenderSettings) -> Self {
        let mut stats = FoldStats::default();
        let mut compile = |expr: Expr| {
            let (compiled, expr_stats) = optimize(expr);
            stats += expr_stats;
            compiled
        };

        let cells = definition
            .cells
            .into_iter()
            .map(|cell| (cell.name, compile(cell.expr)))
            .collect();
        let aggregates = definition
            .aggregates
            .into_iter()
            .map(|agg| CompiledAggregate {
                name: agg.name,
                func: agg.func,
                expr: compile(agg.expr),
            })
            .collect();
        let custom_items = definition
            .custom_items
            .into_iter()
            .map(|item| CompiledItem {
                name: item.name,
                type_name: item.type_name,
                properties: item
                    .properties
                    .into_iter()
                    .map(|(name, expr)| (name, compile(expr)))
                    .collect(),
                width: item.width,
                height: item.height,
            })
            .collect();

        info!(
            "Prepared report '{}': folded {} node(s) into {}",
            definition.name, stats.nodes_before, stats.nodes_after
        );

        Self {
            name: definition.name,
            schema: definition.schema,
            cells,
            aggregates,
            custom_items,
            settings: settings.clone(),
            stats,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn stats(&self) -> FoldStats {
        self.stats
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Folded tree of cell `name`.
    pub fn cell(&self, name: &str) -> Option<&CompiledExpr> {
        self.cells
            .iter()
            .find(|(cell, _)| cell == name)
            .map(|(_, expr)| expr)
    }

    /// Renders `rows` against `rpt`.
    ///
    /// Fails only with [`RdlError::Cancelled`] (or if a worker panics); every
    /// other failure is reported in the output.
    pub fn run(
        &self,
        rpt: &ReportContext,
        rows: &[Row],
        registry: &CustomItemRegistry,
    ) -> RdlResult<RenderOutput> {
        info!("Rendering report '{}' over {} row(s)", self.name, rows.len());
        if rpt.is_cancelled() {
            return Err(RdlError::Cancelled);
        }

        aggregate::accumulate(&self.aggregates, rpt, rows)?;
        let rendered = worker::evaluate_rows(&self.cells, rpt, rows, &self.settings)?;
        let items = self
            .custom_items
            .iter()
            .map(|item| items::drive(item, rpt, rows, registry, &self.settings))
            .collect::<RdlResult<Vec<_>>>()?;

        let errors = rendered
            .iter()
            .flat_map(|row| &row.cells)
            .filter(|cell| cell.is_error())
            .count();
        info!(
            "Rendered report '{}': {} row(s), {} cell error(s)",
            self.name,
            rendered.len(),
            errors
        );

        Ok(RenderOutput {
            rows: rendered,
            items,
        })
    }
}

use log::{trace, warn};
use rdlexpr::{
    context::{ReportContext, Row},
    optimize::CompiledExpr,
};

use crate::{
    base::meta::RenderSettings,
    render::{CellValue, RenderedRow},
    utils::error::{RdlError, RdlResult},
};

pub(super) fn evaluate_cell(
    name: &str,
    expr: &CompiledExpr,
    rpt: &ReportContext,
    row: &Row,
    marker: &str,
) -> CellValue {
    match expr.eval(rpt, row) {
        Ok(value) => CellValue::Value(value),
        Err(err) => {
            warn!("Cell '{}' failed on row {}: {}", name, row.position(), err);
            CellValue::Error {
                marker: marker.to_string(),
                message: err.to_string(),
            }
        }
    }
}

fn evaluate_chunk(
    cells: &[(String, CompiledExpr)],
    rpt: &ReportContext,
    rows: &[Row],
    marker: &str,
) -> RdlResult<Vec<RenderedRow>> {
    let mut rendered = Vec::with_capacity(rows.len());
    for row in rows {
        if rpt.is_cancelled() {
            return Err(RdlError::Cancelled);
        }

        rendered.push(RenderedRow {
            position: row.position(),
            cells: cells
                .iter()
                .map(|(name, expr)| evaluate_cell(name, expr, rpt, row, marker))
                .collect(),
        });
        trace!("Row {} evaluated", row.position());
    }
    Ok(rendered)
}

/// Evaluates every cell of every row. Rows are split into contiguous chunks,
/// one per worker, so concatenating the chunk results keeps row order.
pub(super) fn evaluate_rows(
    cells: &[(String, CompiledExpr)],
    rpt: &ReportContext,
    rows: &[Row],
    settings: &RenderSettings,
) -> RdlResult<Vec<RenderedRow>> {
    let workers = settings.worker_threads.clamp(1, rows.len().max(1));
    if workers == 1 {
        return evaluate_chunk(cells, rpt, rows, &settings.error_marker);
    }

    let chunk_size = rows.len().div_ceil(workers);
    let marker = settings.error_marker.as_str();

    let chunks = crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = rows
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move |_| evaluate_chunk(cells, rpt, chunk, marker)))
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join())
            .collect::<Vec<_>>()
    })
    .map_err(|_| RdlError::Unknown("A render worker panicked".to_string()))?;

    let mut rendered = Vec::with_capacity(rows.len());
    for chunk in chunks {
        let chunk = chunk.map_err(|_| RdlError::Unknown("A render worker panicked".to_string()))?;
        rendered.extend(chunk?);
    }
    Ok(rendered)
}

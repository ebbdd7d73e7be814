use log::{debug, warn};
use rdlexpr::{
    aggregate::Accumulator,
    context::{ReportContext, Row},
};

use crate::{
    render::CompiledAggregate,
    utils::error::{RdlError, RdlResult},
};

/// Read-ahead pass: accumulates every aggregate over `rows` and publishes the
/// results in `rpt`. An aggregate whose input fails on some row is dropped,
/// leaving references to it unbound.
pub(super) fn accumulate(
    aggregates: &[CompiledAggregate],
    rpt: &ReportContext,
    rows: &[Row],
) -> RdlResult<()> {
    rpt.clear_aggregates();
    if aggregates.is_empty() {
        return Ok(());
    }

    let mut accumulators: Vec<Option<Accumulator>> = aggregates
        .iter()
        .map(|agg| Some(Accumulator::new(agg.func)))
        .collect();

    for row in rows {
        if rpt.is_cancelled() {
            return Err(RdlError::Cancelled);
        }

        for (agg, slot) in aggregates.iter().zip(accumulators.iter_mut()) {
            let Some(acc) = slot else {
                continue;
            };

            if let Err(err) = agg.expr.eval(rpt, row).and_then(|value| acc.push(value)) {
                warn!(
                    "Aggregate '{}' dropped at row {}: {}",
                    agg.name,
                    row.position(),
                    err
                );
                *slot = None;
            }
        }
    }

    for (agg, acc) in aggregates.iter().zip(accumulators) {
        let Some(acc) = acc else {
            continue;
        };

        match acc.finish() {
            Ok(value) => {
                debug!("Aggregate {}({}) = {}", agg.func.to_str(), agg.name, value);
                rpt.set_aggregate(agg.name.clone(), value);
            }
            Err(err) => warn!("Aggregate '{}' dropped: {}", agg.name, err),
        }
    }

    Ok(())
}

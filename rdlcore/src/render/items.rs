use std::time::Duration;

use log::{debug, warn};
use rdlexpr::{
    Value,
    context::{CancelToken, ReportContext, Row},
};

use crate::{
    base::meta::RenderSettings,
    item::{CustomItemRegistry, ExtensionError, ExtensionResult, ItemGuard, PropertyMap, Surface},
    render::{CompiledItem, ItemFrame, ItemOutput},
    utils::error::{RdlError, RdlResult},
};

/// Token handed to a single call into an item.
fn call_token(rpt: &ReportContext, settings: &RenderSettings) -> CancelToken {
    match settings.extension_timeout_ms {
        Some(ms) => rpt.cancel_token().with_timeout(Duration::from_millis(ms)),
        None => rpt.cancel_token().clone(),
    }
}

fn evaluate_properties(
    item: &CompiledItem,
    rpt: &ReportContext,
    row: &Row,
    marker: &str,
) -> PropertyMap {
    item.properties
        .iter()
        .map(|(name, expr)| {
            let value = expr.eval(rpt, row).unwrap_or_else(|err| {
                warn!(
                    "Property '{}' of '{}' failed on row {}: {}",
                    name,
                    item.name,
                    row.position(),
                    err
                );
                Value::String(marker.to_string())
            });
            (name.clone(), value)
        })
        .collect()
}

fn render_row(
    guard: &mut ItemGuard,
    properties: &PropertyMap,
    item: &CompiledItem,
    cancel: &CancelToken,
) -> ExtensionResult<Surface> {
    guard.set_properties(properties, cancel)?;
    let mut surface = Surface::new(item.width, item.height);
    guard.draw_image(&mut surface, cancel)?;
    Ok(surface)
}

/// Runs the call sequence of one custom item over the rows.
///
/// Data regions get `set_properties` then `draw_image` for every row, in row
/// order; other items get a single pass against the first row. The first
/// failure ends the sequence. The item is released on every path.
pub(super) fn drive(
    item: &CompiledItem,
    rpt: &ReportContext,
    rows: &[Row],
    registry: &CustomItemRegistry,
    settings: &RenderSettings,
) -> RdlResult<ItemOutput> {
    let mut output = ItemOutput {
        name: item.name.clone(),
        frames: Vec::new(),
    };

    let mut guard = match registry.create(&item.type_name) {
        Ok(guard) => guard,
        Err(err) => {
            warn!("Custom item '{}' could not be created: {}", item.name, err);
            output.frames.push(ItemFrame::Failed {
                row: None,
                message: err.to_string(),
            });
            return Ok(output);
        }
    };

    let empty = Row::empty();
    let targets: Vec<&Row> = if guard.is_data_region() {
        rows.iter().collect()
    } else {
        vec![rows.first().unwrap_or(&empty)]
    };
    debug!(
        "Driving custom item '{}' ({}) over {} row(s)",
        item.name,
        guard.type_name(),
        targets.len()
    );

    for row in targets {
        if rpt.is_cancelled() {
            return Err(RdlError::Cancelled);
        }

        let properties = evaluate_properties(item, rpt, row, &settings.error_marker);
        let cancel = call_token(rpt, settings);
        match render_row(&mut guard, &properties, item, &cancel) {
            Ok(surface) => output.frames.push(ItemFrame::Image {
                row: row.position(),
                surface,
            }),
            Err(ExtensionError::Cancelled) if rpt.is_cancelled() => {
                return Err(RdlError::Cancelled);
            }
            Err(err) => {
                // A cancellation here is the per-call timeout expiring.
                let err = RdlError::ExtensionFailure {
                    item: item.name.clone(),
                    message: err.to_string(),
                };
                warn!("Custom item '{}' failed on row {}: {}", item.name, row.position(), err);
                output.frames.push(ItemFrame::Failed {
                    row: Some(row.position()),
                    message: err.to_string(),
                });
                break;
            }
        }
    }

    Ok(output)
}

//! Custom report items: regions rendered by extensions.
//!
//! The render driver talks to an item through [`CustomReportItem`] in a fixed
//! order: [`CustomReportItem::is_data_region`], then for every row (or once for
//! non-data regions) [`CustomReportItem::set_properties`] followed by
//! [`CustomReportItem::draw_image`]. Design-time tools use the remaining
//! methods. Items are always held through an [`ItemGuard`], which releases
//! them exactly once whatever path the caller leaves by.
use std::{
    collections::BTreeMap,
    ops::{Deref, DerefMut},
    sync::Arc,
};

use log::debug;
use rdlexpr::{Value, context::CancelToken};
use thiserror::Error;

use crate::utils::{error::RdlError, opaque::OpaqueObject};

pub mod markup;
pub mod registry;
pub mod surface;

pub use markup::{CustomItemMarkup, CustomProperties, CustomProperty};
pub use registry::CustomItemRegistry;
pub use surface::{Rgba, Surface};

/// Evaluated runtime properties, by name.
pub type PropertyMap = BTreeMap<String, Value>;

/// Failure reported by a custom report item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtensionError {
    #[error("{0}")]
    Failed(String),

    #[error("Invalid property '{name}': {message}")]
    InvalidProperty { name: String, message: String },

    #[error("Operation was cancelled")]
    Cancelled,
}

impl ExtensionError {
    /// Converts into the engine error attributed to item `item`.
    pub fn into_rdl_error(self, item: &str) -> RdlError {
        match self {
            ExtensionError::Cancelled => RdlError::Cancelled,
            other => RdlError::ExtensionFailure {
                item: item.to_string(),
                message: other.to_string(),
            },
        }
    }
}

pub type ExtensionResult<T> = Result<T, ExtensionError>;

/// Protocol implemented by custom report items.
///
/// Long running implementations should poll the [`CancelToken`] they are
/// handed and return [`ExtensionError::Cancelled`] once it fires.
pub trait CustomReportItem: Send {
    /// Whether the item is bound to the rows of a data region.
    fn is_data_region(&self) -> bool;

    /// Receives the evaluated properties of the current row.
    fn set_properties(
        &mut self,
        properties: &PropertyMap,
        cancel: &CancelToken,
    ) -> ExtensionResult<()>;

    /// Draws the item with the last properties received.
    fn draw_image(&mut self, surface: &mut Surface, cancel: &CancelToken) -> ExtensionResult<()>;

    /// Design time: draws a placeholder without any data.
    fn draw_designer_image(&mut self, surface: &mut Surface) -> ExtensionResult<()>;

    /// Design time: builds the object describing the properties in `markup`.
    fn get_properties_instance(&self, markup: &CustomProperties) -> Box<dyn OpaqueObject>;

    /// Design time: writes `instance` back into `markup`.
    fn set_properties_instance(
        &self,
        markup: &mut CustomProperties,
        instance: &dyn OpaqueObject,
    ) -> ExtensionResult<()>;

    /// Design time: the `<CustomReportItem>` fragment inserted for a new item.
    fn custom_report_item_xml(&self) -> String;

    /// Releases resources held by the item. Called exactly once, by [`ItemGuard`].
    fn release(&mut self) {}
}

/// Owns a [`CustomReportItem`] and releases it when dropped.
///
/// If the item comes from a dynamic library, the guard keeps that library
/// loaded for as long as the item lives.
pub struct ItemGuard {
    type_name: String,
    item: Box<dyn CustomReportItem>,
    /// SAFETY: Drop order ensures that the library is not unloaded before the item is dropped.
    ///
    /// DO NOT CHANGE THE ORDER OF FIELDS!
    _lib: Option<Arc<libloading::Library>>,
}

impl ItemGuard {
    pub fn new(type_name: impl Into<String>, item: Box<dyn CustomReportItem>) -> Self {
        Self {
            type_name: type_name.into(),
            item,
            _lib: None,
        }
    }

    pub(crate) fn with_library(mut self, library: Option<Arc<libloading::Library>>) -> Self {
        self._lib = library;
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Design time: renders the designer placeholder on a fresh surface.
    pub fn designer_image(&mut self, width: u32, height: u32) -> Result<Surface, RdlError> {
        let mut surface = Surface::new(width, height);
        self.item
            .draw_designer_image(&mut surface)
            .map_err(|e| e.into_rdl_error(&self.type_name))?;
        Ok(surface)
    }
}

impl Deref for ItemGuard {
    type Target = dyn CustomReportItem;

    fn deref(&self) -> &Self::Target {
        &*self.item
    }
}

impl DerefMut for ItemGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.item
    }
}

impl Drop for ItemGuard {
    fn drop(&mut self) {
        debug!("Releasing custom report item '{}'", self.type_name);
        self.item.release();
    }
}

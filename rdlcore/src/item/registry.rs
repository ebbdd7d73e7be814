use std::{collections::BTreeMap, sync::Arc};

use libloading::Library;
use log::debug;
use parking_lot::RwLock;

use crate::{
    base::ext::{CustomItemExt, CustomItemExtStatic, CustomItemExtWrapper},
    item::ItemGuard,
    utils::error::{RdlError, RdlResult},
};

struct Entry {
    ext: Arc<dyn CustomItemExt>,
    /// Dropped after `ext`. DO NOT CHANGE THE ORDER OF FIELDS!
    library: Option<Arc<Library>>,
}

/// Custom report item factories, by type name.
#[derive(Default)]
pub struct CustomItemRegistry {
    entries: RwLock<BTreeMap<String, Entry>>,
}

impl CustomItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, ext: Arc<dyn CustomItemExt>, library: Option<Arc<Library>>) {
        let name = ext.name().to_string();
        debug!("Registering custom item '{}' ({}, v{})", name, ext.uuid(), ext.version());
        if self
            .entries
            .write()
            .insert(name.clone(), Entry { ext, library })
            .is_some()
        {
            debug!("Custom item '{}' replaced a previous registration", name);
        }
    }

    /// Registers an in-process extension.
    pub fn register(&self, ext: Arc<dyn CustomItemExt>) {
        self.insert(ext, None);
    }

    pub fn register_static<T: CustomItemExtStatic + 'static>(&self) {
        self.register(Arc::new(T::new()));
    }

    /// Registers an extension loaded from a dynamic library.
    pub fn register_loaded(&self, wrapper: CustomItemExtWrapper) {
        let (ext, library) = wrapper.into_parts();
        self.insert(Arc::from(ext), Some(library));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Registered type names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CustomItemExt>> {
        self.entries.read().get(name).map(|entry| Arc::clone(&entry.ext))
    }

    /// Creates a new item of type `name`, guarded for release.
    pub fn create(&self, name: &str) -> RdlResult<ItemGuard> {
        let entries = self.entries.read();
        let entry = entries
            .get(name)
            .ok_or_else(|| RdlError::ExtensionNotFound(name.to_string()))?;

        Ok(ItemGuard::new(name, entry.ext.create()).with_library(entry.library.clone()))
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.entries.write().remove(name).is_some()
    }
}

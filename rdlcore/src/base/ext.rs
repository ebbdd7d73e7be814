use std::{ops::Deref, sync::Arc};

use libloading::Library;
use log::debug;
use semver::{Version, VersionReq};
use uuid::Uuid;

use crate::{
    base::meta::EngineMetaInfo,
    item::CustomReportItem,
    magic::{EXT_COMPATIBILITY_CHECK_FN_NAME, EXT_LOADER_FN_NAME},
    utils::error::{RdlError, RdlResult},
};

/// Prototype of the extension loader function. Function name should be [`EXT_LOADER_FN_NAME`].
pub type ExtLoaderFn = unsafe fn(Uuid) -> RdlResult<Box<dyn CustomItemExt>>;

/// Prototype of the extension compatibility version check function. Function name should be
/// [`EXT_COMPATIBILITY_CHECK_FN_NAME`].
pub type ExtCompatibilityCheckFn = unsafe fn() -> VersionReq;

/// Macro to define the compatibility check function for a custom item plugin.
#[macro_export]
macro_rules! define_custom_item_compatibility {
    (
        $compat:literal
    ) => {
        #[unsafe(no_mangle)]
        pub fn __rdlext_fn_compatibility_check() -> $crate::semver::VersionReq {
            $crate::semver::VersionReq::parse($compat)
                .expect("malformed compatibility requirement")
        }
    };
}

/// Macro that defines the loader function for the custom items of a plugin.
#[macro_export]
macro_rules! define_custom_item_loader {
    (
        $( $item_ty:ty ),+
        $(,)?
    ) => {
        #[unsafe(no_mangle)]
        pub unsafe fn __rdlext_fn_loader(
            uuid: $crate::uuid::Uuid,
        ) -> $crate::utils::error::RdlResult<Box<dyn $crate::base::ext::CustomItemExt>> {
            match uuid {
                $(
                    <$item_ty as $crate::base::ext::CustomItemExtStatic>::UUID => {
                        Ok(Box::new(<$item_ty as $crate::base::ext::CustomItemExtStatic>::new()))
                    },
                )+
                _ => Err($crate::utils::error::RdlError::ExtensionNotFound(uuid.to_string())),
            }
        }
    };
}

/// Factory for one type of custom report item.
pub trait CustomItemExt: Send + Sync {
    fn uuid(&self) -> Uuid;

    fn version(&self) -> &Version;

    /// Type name report definitions refer to the item by.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Creates a fresh item instance, one per report item.
    fn create(&self) -> Box<dyn CustomReportItem>;
}

pub trait CustomItemExtStatic: CustomItemExt {
    const UUID: Uuid;

    fn new() -> Self;
}

/// Wrapper around a dynamically loaded custom item extension.
///
/// Prevents the library from being unloaded while the extension is in use.
pub struct CustomItemExtWrapper {
    ext: Box<dyn CustomItemExt>,
    /// SAFETY: Drop order ensures that the library is not unloaded before the extension is dropped.
    ///
    /// DO NOT CHANGE THE ORDER OF FIELDS!
    lib: Arc<Library>,
}

impl CustomItemExtWrapper {
    /// Splits the wrapper. The extension must be dropped before the library.
    pub(crate) fn into_parts(self) -> (Box<dyn CustomItemExt>, Arc<Library>) {
        (self.ext, self.lib)
    }
}

impl Deref for CustomItemExtWrapper {
    type Target = dyn CustomItemExt;

    fn deref(&self) -> &Self::Target {
        &*self.ext
    }
}

pub fn load_custom_item_ext_by_name(
    meta_info: &EngineMetaInfo,
    name: &str,
    library_version: Version,
) -> RdlResult<CustomItemExtWrapper> {
    let ext_info = meta_info
        .find_ext(name)
        .ok_or(RdlError::ExtensionNotFound(name.to_string()))?;

    let load_error = |e| RdlError::ExtensionLoadError {
        source: e,
        file: ext_info.path.clone(),
        name: ext_info.name.clone(),
    };

    debug!("Loading custom item '{}' from '{}'", ext_info.name, ext_info.path);

    // Load the dynamic library
    unsafe {
        let library = Library::new(&ext_info.path).map_err(load_error)?;

        // Get the compatibility check function
        let compat_check_fn: libloading::Symbol<ExtCompatibilityCheckFn> = library
            .get(EXT_COMPATIBILITY_CHECK_FN_NAME.as_bytes())
            .map_err(load_error)?;

        // Check compatibility
        let compat_req = compat_check_fn();
        if !compat_req.matches(&library_version) {
            return Err(RdlError::CompatibilityCheckFailed {
                file: ext_info.path.clone(),
                name: ext_info.name.clone(),
                version: library_version,
                req: compat_req,
            });
        }

        // Get the loader function
        let loader_fn: libloading::Symbol<ExtLoaderFn> = library
            .get(EXT_LOADER_FN_NAME.as_bytes())
            .map_err(load_error)?;

        // Load the extension
        let ext = loader_fn(ext_info.uuid)?;
        if ext.uuid() != ext_info.uuid {
            return Err(RdlError::Unknown(format!(
                "Extension '{}' answered with UUID {} instead of {}",
                ext_info.name,
                ext.uuid(),
                ext_info.uuid
            )));
        }

        Ok(CustomItemExtWrapper {
            ext,
            lib: Arc::new(library),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::meta::ExtMetaInfo;

    #[test]
    fn unknown_extension_is_not_found() {
        let meta = EngineMetaInfo::default();
        let err = load_custom_item_ext_by_name(&meta, "BarCode", Version::new(0, 1, 0))
            .err()
            .unwrap();
        assert!(matches!(err, RdlError::ExtensionNotFound(ref name) if name == "BarCode"));
    }

    #[test]
    fn missing_library_is_a_load_error() {
        let meta = EngineMetaInfo {
            ext: vec![ExtMetaInfo {
                uuid: Uuid::new_v4(),
                path: "/nonexistent/librdl_barcode.so".to_string(),
                name: "BarCode".to_string(),
            }],
            ..Default::default()
        };
        let err = load_custom_item_ext_by_name(&meta, "BarCode", Version::new(0, 1, 0))
            .err()
            .unwrap();
        assert!(matches!(err, RdlError::ExtensionLoadError { ref name, .. } if name == "BarCode"));
    }
}

use log::info;
use rdlexpr::context::{ReportContext, Row};
use semver::Version;

use crate::{
    base::meta::EngineMetaInfo,
    item::CustomItemRegistry,
    render::{RenderJob, RenderOutput, ReportDefinition},
    utils::{
        error::{RdlError, RdlResult},
        opaque::{OpaqueList, OpaqueObject},
    },
};

pub mod api;
pub mod ext;
pub mod meta;

/// Version of this crate, the one plugins check their compatibility against.
pub fn engine_version() -> RdlResult<Version> {
    Version::parse(env!("CARGO_PKG_VERSION"))
        .map_err(|e| RdlError::Unknown(format!("Invalid engine version: {}", e)))
}

/// Engine state shared by every render job of an application.
pub struct EngineContext {
    /// Version of the engine.
    pub version: Version,

    /// Information about the application that created this engine.
    pub application_name: String,
    pub application_version: Version,

    /// Configuration the engine was created with.
    pub meta: EngineMetaInfo,

    /// Custom report items available to report definitions.
    pub registry: CustomItemRegistry,

    ext: OpaqueList,
}

impl EngineContext {
    pub fn create(create_info: api::EngineCreateInfo) -> RdlResult<Self> {
        let version = engine_version()?;
        let meta = match create_info.meta {
            Some(meta) => meta,
            None => {
                let path = EngineMetaInfo::default_path();
                if path.exists() {
                    EngineMetaInfo::load_from_toml(&path)?
                } else {
                    EngineMetaInfo::default()
                }
            }
        };

        let registry = CustomItemRegistry::new();
        for name in &create_info.enabled_extensions {
            let ext = ext::load_custom_item_ext_by_name(&meta, name, version.clone())?;
            registry.register_loaded(ext);
        }

        info!(
            "Created rdl engine v{} for {} v{} ({} custom item(s) loaded)",
            version,
            create_info.application_info.application_name,
            Version::from(create_info.application_info.application_version),
            create_info.enabled_extensions.len()
        );

        Ok(EngineContext {
            version,
            application_name: create_info.application_info.application_name,
            application_version: create_info.application_info.application_version.into(),
            meta,
            registry,
            ext: create_info.ext,
        })
    }

    /// Returns the creation parameter of type `T`, if one was supplied.
    pub fn ext_info<T: OpaqueObject>(&self) -> Option<&T> {
        self.ext.find::<T>()
    }

    /// Folds the trees of `definition` with the configured render settings.
    pub fn prepare(&self, definition: ReportDefinition) -> RenderJob {
        RenderJob::prepare(definition, &self.meta.render)
    }

    pub fn render(&self, job: &RenderJob, rpt: &ReportContext, rows: &[Row]) -> RdlResult<RenderOutput> {
        job.run(rpt, rows, &self.registry)
    }
}

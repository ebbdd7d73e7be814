use std::sync::Arc;

use crate::{
    base::{EngineContext, meta::EngineMetaInfo},
    utils::{error::RdlResult, opaque::OpaqueList},
};

/// Semantic version triple passed between embedders and the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct VersionInfo {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl From<VersionInfo> for semver::Version {
    fn from(info: VersionInfo) -> Self {
        semver::Version::new(info.major as u64, info.minor as u64, info.patch as u64)
    }
}

/// Describes the embedding application.
pub struct ApplicationInfo {
    pub application_version: VersionInfo,
    pub application_name: String,
}

/// Container used to request the creation of an [`EngineContext`].
pub struct EngineCreateInfo {
    pub application_info: ApplicationInfo,
    /// Type names of the plugin items to load, as listed in the configuration.
    pub enabled_extensions: Vec<String>,
    /// Configuration to use. Read from [`EngineMetaInfo::default_path`] when absent.
    pub meta: Option<EngineMetaInfo>,
    /// Extension specific creation parameters.
    pub ext: OpaqueList,
}

/// Creates and initializes a new [`EngineContext`].
pub fn create_engine(create_info: EngineCreateInfo) -> RdlResult<Arc<EngineContext>> {
    EngineContext::create(create_info).map(Arc::new)
}

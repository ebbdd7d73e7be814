/// Name of the custom item loader function exported by plugins.
pub const EXT_LOADER_FN_NAME: &str = "__rdlext_fn_loader";

/// Name of the compatibility version check function exported by plugins.
pub const EXT_COMPATIBILITY_CHECK_FN_NAME: &str = "__rdlext_fn_compatibility_check";

/// Name of the environment variable containing the path to the engine configuration file.
/// If not set, defaults to
///  (1) on Linux and macOS: `$XDG_CONFIG_HOME/rdl/meta.toml` or `$HOME/.config/rdl/meta.toml`
///  (2) on Windows: `%APPDATA%\rdl\meta.toml`
pub const ENV_META_CONFIG_PATH: &str = "RDL_CONFIG_PATH";

/// Marker rendered in place of a cell whose expression failed.
pub const DEFAULT_ERROR_MARKER: &str = "#Error";

/// Root element of the custom report item markup.
pub const CUSTOM_REPORT_ITEM_TAG: &str = "CustomReportItem";

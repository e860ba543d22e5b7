use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::IdegenError;
use crate::IdegenResult;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] =
	["idegen.toml", ".idegen.toml", ".config/idegen.toml"];

/// Environment variable overriding the template root directory.
pub const TEMPLATES_DIR_ENV: &str = "IDEGEN_TEMPLATES_DIR";

/// Environment variable overriding the build tool executable.
pub const BUILD_TOOL_ENV: &str = "IDEGEN_BUILD_TOOL";

/// Executable names tried on `PATH` when no build tool is configured.
pub const DEFAULT_BUILD_TOOL_NAMES: [&str; 2] = ["platformio", "pio"];

/// Configuration loaded from an `idegen.toml` file in the project root.
///
/// ```toml
/// templates_dir = "tools/ide-templates"
/// build_tool = "/opt/pio/bin/platformio"
/// ```
///
/// Both keys are optional. Relative paths are resolved against the project
/// directory.
#[derive(Debug, Default, Deserialize)]
pub struct IdegenConfig {
	/// Directory containing one subdirectory of `*.tpl` files per IDE.
	#[serde(default)]
	pub templates_dir: Option<PathBuf>,
	/// The PlatformIO executable used to extract IDE data.
	#[serde(default)]
	pub build_tool: Option<PathBuf>,
}

impl IdegenConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if the file does not exist.
	pub fn load(root: &Path) -> IdegenResult<Option<IdegenConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		tracing::debug!(path = %config_path.display(), "loading idegen config");
		let content = std::fs::read_to_string(&config_path)?;
		let config: IdegenConfig =
			toml::from_str(&content).map_err(|e| IdegenError::ConfigParse(e.to_string()))?;

		Ok(Some(config))
	}
}

/// Values supplied on the command line or through environment variables.
/// These take precedence over `idegen.toml`.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
	pub templates_dir: Option<PathBuf>,
	pub build_tool: Option<PathBuf>,
}

/// The effective settings for one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSettings {
	pub templates_dir: PathBuf,
	pub build_tool: PathBuf,
}

impl ResolvedSettings {
	/// Resolve settings for the project at `root`.
	///
	/// Precedence: `overrides`, then `idegen.toml`, then the bundled template
	/// root and the first build tool found on `PATH`.
	pub fn resolve(root: &Path, overrides: &SettingsOverrides) -> IdegenResult<Self> {
		let config = IdegenConfig::load(root)?.unwrap_or_default();

		let templates_dir = overrides
			.templates_dir
			.clone()
			.or_else(|| config.templates_dir.map(|dir| root.join(dir)))
			.unwrap_or_else(bundled_templates_dir);

		let build_tool = overrides
			.build_tool
			.clone()
			.or_else(|| config.build_tool.map(|tool| resolve_tool_path(root, tool)))
			.unwrap_or_else(default_build_tool);

		Ok(Self {
			templates_dir,
			build_tool,
		})
	}
}

/// The template root shipped with this crate.
pub fn bundled_templates_dir() -> PathBuf {
	Path::new(env!("CARGO_MANIFEST_DIR")).join("templates")
}

/// Locate PlatformIO on `PATH`, falling back to the bare executable name so
/// that spawning reports a useful error.
pub fn default_build_tool() -> PathBuf {
	DEFAULT_BUILD_TOOL_NAMES
		.iter()
		.find_map(|name| which::which(name).ok())
		.unwrap_or_else(|| PathBuf::from(DEFAULT_BUILD_TOOL_NAMES[0]))
}

/// Bare program names are left for `PATH` lookup; anything with a directory
/// component is relative to the project.
fn resolve_tool_path(root: &Path, tool: PathBuf) -> PathBuf {
	if tool.is_relative() && tool.components().count() > 1 {
		root.join(tool)
	} else {
		tool
	}
}

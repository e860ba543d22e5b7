use std::collections::BTreeMap;

use derive_more::Deref;
use serde::Serialize;

use crate::BuildMetadata;
use crate::EnvironmentSettings;
use crate::IdegenResult;

/// The sources merged into [`TemplateVariables`], in merge order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableLayer {
	/// Options of the selected `[env:NAME]` section.
	Environment,
	/// Fields of the idedata dump.
	BuildData,
	/// Facts about the project and host computed by the generator.
	Derived,
}

/// Facts computed by the generator rather than read from the project or the
/// build tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DerivedFacts {
	pub project_name: String,
	pub src_files: Vec<String>,
	pub user_home_dir: String,
	pub project_dir: String,
	pub project_src_dir: String,
	pub project_lib_dir: String,
	pub project_libdeps_dir: String,
	pub systype: String,
	pub platformio_path: String,
	pub env_pathsep: String,
	pub env_path: String,
}

/// The flat variable mapping every template is rendered with.
///
/// Built from three layers merged in a fixed order: environment settings,
/// then build metadata, then derived facts. On a key collision the later
/// layer's value replaces the earlier one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deref)]
#[serde(transparent)]
pub struct TemplateVariables(BTreeMap<String, serde_json::Value>);

impl TemplateVariables {
	pub fn from_layers(
		environment: &EnvironmentSettings,
		build: &BuildMetadata,
		derived: &DerivedFacts,
	) -> IdegenResult<Self> {
		let mut variables = Self::default();
		variables.merge_layer(VariableLayer::Environment, serde_json::to_value(environment)?);
		variables.merge_layer(VariableLayer::BuildData, serde_json::to_value(build)?);
		variables.merge_layer(VariableLayer::Derived, serde_json::to_value(derived)?);

		Ok(variables)
	}

	fn merge_layer(&mut self, layer: VariableLayer, value: serde_json::Value) {
		let serde_json::Value::Object(entries) = value else {
			return;
		};

		for (key, value) in entries {
			if self.0.insert(key.clone(), value).is_some() {
				tracing::debug!(key = %key, ?layer, "template variable overwritten");
			}
		}
	}
}

/// How path values are escaped before they reach the templates.
///
/// Templates embed paths inside quoted strings of the generated files, and on
/// Windows each backslash has to survive two rounds of unescaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathEscaping {
	/// Paths are stored unchanged.
	Verbatim,
	/// Every run of backslashes becomes exactly four backslashes.
	QuadrupleBackslashes,
}

impl PathEscaping {
	/// The strategy for the platform this binary runs on.
	pub fn for_host() -> Self {
		if cfg!(windows) {
			Self::QuadrupleBackslashes
		} else {
			Self::Verbatim
		}
	}

	pub fn apply(self, path: &str) -> String {
		match self {
			Self::Verbatim => path.to_string(),
			Self::QuadrupleBackslashes => {
				let mut escaped = String::with_capacity(path.len() * 2);
				let mut in_run = false;
				for ch in path.chars() {
					if ch == '\\' {
						if !in_run {
							escaped.push_str("\\\\\\\\");
						}
						in_run = true;
					} else {
						escaped.push(ch);
						in_run = false;
					}
				}
				escaped
			}
		}
	}
}

/// PlatformIO's platform identifier for the host, e.g. `linux_x86_64`,
/// `darwin_arm64` or `windows_amd64`.
pub fn host_systype() -> String {
	systype(std::env::consts::OS, std::env::consts::ARCH)
}

pub fn systype(os: &str, arch: &str) -> String {
	let os = match os {
		"macos" => "darwin",
		other => other,
	};
	let arch = match (os, arch) {
		("windows", "x86_64") => "amd64",
		("linux", "arm") => "armv7l",
		(_, other) => other,
	};

	format!("{os}_{arch}")
}

/// Separator between entries of the `PATH` environment variable.
pub fn host_path_separator() -> &'static str {
	if cfg!(windows) { ";" } else { ":" }
}

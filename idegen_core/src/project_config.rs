use std::collections::BTreeMap;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use derive_more::Deref;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::de::MapAccess;
use serde::de::Visitor;

use crate::IdegenError;
use crate::IdegenResult;

/// The PlatformIO project configuration file name.
pub const PROJECT_CONFIG_FILE: &str = "platformio.ini";

/// Key added to [`EnvironmentSettings`] holding the environment name.
pub const ENV_NAME_KEY: &str = "env_name";

pub const DEFAULT_SRC_DIR: &str = "src";
pub const DEFAULT_LIB_DIR: &str = "lib";
pub const DEFAULT_WORKSPACE_DIR: &str = ".pio";

const ENV_SECTION_PREFIX: &str = "env:";
const COMMON_ENV_SECTION: &str = "env";
const PLATFORMIO_SECTION: &str = "platformio";
const SYSENV_SECTION: &str = "sysenv";
const EXTENDS_OPTION: &str = "extends";
const MAX_INTERPOLATION_DEPTH: usize = 10;

/// Joins folded continuation lines until the values are split back apart.
const CONTINUATION_SEPARATOR: char = '\u{1f}';

/// Options of one `[env:NAME]` section after inheritance and interpolation,
/// plus the [`ENV_NAME_KEY`] entry.
///
/// Empty when the environment does not exist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deref)]
#[serde(transparent)]
pub struct EnvironmentSettings(BTreeMap<String, String>);

impl EnvironmentSettings {
	pub fn new(options: BTreeMap<String, String>) -> Self {
		Self(options)
	}

	/// The environment this mapping was read from.
	pub fn env_name(&self) -> Option<&str> {
		self.0.get(ENV_NAME_KEY).map(String::as_str)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Section {
	name: String,
	options: Vec<(String, String)>,
}

/// A parsed `platformio.ini`.
///
/// Sections keep their file order. Option lookups follow PlatformIO's rules:
/// an `[env:NAME]` section inherits from `[env]` and from every section named
/// in its `extends` option, and `${section.option}` / `${sysenv.VAR}`
/// references are resolved on read.
#[derive(Debug, Clone, Default)]
pub struct ProjectConfig {
	path: Option<PathBuf>,
	sections: Vec<Section>,
}

impl ProjectConfig {
	/// Load `platformio.ini` from `project_dir`. A missing file yields an
	/// empty configuration.
	pub fn load(project_dir: &Path) -> IdegenResult<Self> {
		let path = project_dir.join(PROJECT_CONFIG_FILE);
		if !path.is_file() {
			tracing::debug!(path = %path.display(), "no project config found");
			return Ok(Self::default());
		}

		let content = std::fs::read_to_string(&path)?;
		let mut config = Self::parse_at(&content, &path.display().to_string())?;
		config.path = Some(path);

		Ok(config)
	}

	/// Parse INI content. Indented lines continue the previous option's value
	/// and full-line or whitespace-prefixed `;`/`#` comments are dropped.
	pub fn parse(content: &str) -> IdegenResult<Self> {
		Self::parse_at(content, PROJECT_CONFIG_FILE)
	}

	fn parse_at(content: &str, path_display: &str) -> IdegenResult<Self> {
		let folded = fold_continuation_lines(content);
		let document: IniDocument =
			serde_ini::from_str(&folded).map_err(|e| IdegenError::ProjectConfigParse {
				path: path_display.to_string(),
				reason: e.to_string(),
			})?;

		let sections = document
			.0
			.into_iter()
			.map(|section| {
				Section {
					name: section.name.trim().to_string(),
					options: section
						.options
						.into_iter()
						.map(|(key, value)| (key.trim().to_string(), unfold_value(&value)))
						.collect(),
				}
			})
			.collect();

		Ok(Self {
			path: None,
			sections,
		})
	}

	/// Path of the loaded file, if one existed.
	pub fn path(&self) -> Option<&Path> {
		self.path.as_deref()
	}

	/// Environment names in file order, without the `env:` prefix.
	pub fn envs(&self) -> Vec<String> {
		let mut seen = HashSet::new();
		self.sections
			.iter()
			.filter_map(|section| section.name.strip_prefix(ENV_SECTION_PREFIX))
			.filter(|name| seen.insert(*name))
			.map(str::to_string)
			.collect()
	}

	/// Environments listed in `[platformio] default_envs`.
	pub fn default_envs(&self) -> Vec<String> {
		self.platformio_option("default_envs")
			.or_else(|| self.platformio_option("env_default"))
			.map(|value| split_multi_values(&value))
			.unwrap_or_default()
	}

	/// The environment PlatformIO builds when none is named: the first default
	/// env, otherwise the first `[env:NAME]` section.
	pub fn default_env_name(&self) -> Option<String> {
		self.default_envs()
			.into_iter()
			.next()
			.or_else(|| self.envs().into_iter().next())
	}

	/// Options for `env_name` with inheritance and interpolation applied.
	/// Returns `None` when there is no `[env:<env_name>]` section.
	pub fn env_items(&self, env_name: &str) -> Option<BTreeMap<String, String>> {
		let raw = self.raw_env_items(env_name)?;
		Some(
			raw.into_iter()
				.map(|(key, value)| {
					let value = self.interpolate(&value, 0);
					(key, value)
				})
				.collect(),
		)
	}

	/// Look up a single option, resolving references.
	pub fn get(&self, section: &str, option: &str) -> Option<String> {
		self.lookup(section, option)
			.map(|value| self.interpolate(&value, 0))
	}

	/// Directory holding PlatformIO's build artifacts.
	pub fn workspace_dir(&self) -> PathBuf {
		self.platformio_option("workspace_dir")
			.map_or_else(|| PathBuf::from(DEFAULT_WORKSPACE_DIR), PathBuf::from)
	}

	/// The project's source directory, relative to the project unless
	/// configured as an absolute path.
	pub fn src_dir(&self) -> PathBuf {
		self.platformio_option("src_dir")
			.map_or_else(|| PathBuf::from(DEFAULT_SRC_DIR), PathBuf::from)
	}

	pub fn lib_dir(&self) -> PathBuf {
		self.platformio_option("lib_dir")
			.map_or_else(|| PathBuf::from(DEFAULT_LIB_DIR), PathBuf::from)
	}

	pub fn libdeps_dir(&self) -> PathBuf {
		self.platformio_option("libdeps_dir")
			.map_or_else(|| self.workspace_dir().join("libdeps"), PathBuf::from)
	}

	fn platformio_option(&self, option: &str) -> Option<String> {
		self.get(PLATFORMIO_SECTION, option)
	}

	fn has_section(&self, name: &str) -> bool {
		self.sections.iter().any(|section| section.name == name)
	}

	/// Options of every section called `name`, later definitions winning.
	fn section_options(&self, name: &str) -> BTreeMap<String, String> {
		self.sections
			.iter()
			.filter(|section| section.name == name)
			.flat_map(|section| section.options.iter().cloned())
			.collect()
	}

	fn raw_env_items(&self, env_name: &str) -> Option<BTreeMap<String, String>> {
		let section_name = format!("{ENV_SECTION_PREFIX}{env_name}");
		if !self.has_section(&section_name) {
			return None;
		}

		let mut items = self.section_options(COMMON_ENV_SECTION);
		let mut visited = HashSet::new();
		items.extend(self.layered_options(&section_name, &mut visited));

		Some(items)
	}

	/// Options of `section_name` layered over the sections it extends. Bases
	/// listed later override earlier ones.
	fn layered_options(
		&self,
		section_name: &str,
		visited: &mut HashSet<String>,
	) -> BTreeMap<String, String> {
		let mut items = BTreeMap::new();
		if !visited.insert(section_name.to_string()) {
			tracing::warn!(section = section_name, "circular `extends` in platformio.ini");
			return items;
		}

		let own = self.section_options(section_name);
		if let Some(extends) = own.get(EXTENDS_OPTION) {
			for base in split_multi_values(extends) {
				items.extend(self.layered_options(&base, visited));
			}
		}
		items.extend(own);

		items
	}

	fn lookup(&self, section: &str, option: &str) -> Option<String> {
		if section == SYSENV_SECTION {
			return std::env::var(option).ok();
		}

		if let Some(env_name) = section.strip_prefix(ENV_SECTION_PREFIX) {
			return self.raw_env_items(env_name)?.remove(option);
		}

		self.section_options(section).remove(option)
	}

	fn interpolate(&self, value: &str, depth: usize) -> String {
		if depth >= MAX_INTERPOLATION_DEPTH || !value.contains("${") {
			return value.to_string();
		}

		let mut result = String::with_capacity(value.len());
		let mut rest = value;

		while let Some(start) = rest.find("${") {
			result.push_str(&rest[..start]);
			let after = &rest[start + 2..];
			let Some(end) = after.find('}') else {
				result.push_str(&rest[start..]);
				rest = "";
				break;
			};

			let reference = &after[..end];
			let resolved = reference
				.split_once('.')
				.and_then(|(section, option)| self.lookup(section, option));

			if let Some(resolved) = resolved {
				result.push_str(&self.interpolate(&resolved, depth + 1));
			} else {
				tracing::warn!(reference, "unresolved reference in platformio.ini");
				result.push_str(&rest[start..start + end + 3]);
			}

			rest = &after[end + 1..];
		}

		result.push_str(rest);
		result
	}
}

/// Split a multi-value option on newlines and commas.
pub fn split_multi_values(value: &str) -> Vec<String> {
	value
		.split(|c| c == '\n' || c == ',')
		.map(str::trim)
		.filter(|item| !item.is_empty())
		.map(str::to_string)
		.collect()
}

/// Prepare INI content for the line-based parser: drop blank lines and
/// comments, and append indented continuation lines to the option above
/// them.
fn fold_continuation_lines(content: &str) -> String {
	let mut lines: Vec<String> = Vec::new();
	let mut in_option = false;

	for raw in content.lines() {
		let line = strip_inline_comment(raw).trim();
		if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
			continue;
		}

		if in_option && raw.starts_with(char::is_whitespace) {
			if let Some(last) = lines.last_mut() {
				last.push(CONTINUATION_SEPARATOR);
				last.push_str(line);
			}
			continue;
		}

		in_option = !line.starts_with('[');
		lines.push(line.to_string());
	}

	lines.join("\n")
}

fn unfold_value(value: &str) -> String {
	value
		.split(CONTINUATION_SEPARATOR)
		.map(str::trim)
		.collect::<Vec<_>>()
		.join("\n")
		.trim()
		.to_string()
}

/// Comment markers only count when preceded by whitespace, so values like
/// `-DNAME=a;b` survive.
fn strip_inline_comment(line: &str) -> &str {
	let mut previous_is_space = false;
	for (index, ch) in line.char_indices() {
		if (ch == ';' || ch == '#') && previous_is_space {
			return &line[..index];
		}
		previous_is_space = ch.is_whitespace();
	}

	line
}

/// Sections in file order. `serde_ini` hands entries to the visitor in the
/// order they appear, which a `BTreeMap` would lose.
struct IniDocument(Vec<Section>);

impl<'de> Deserialize<'de> for IniDocument {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		struct DocumentVisitor;

		impl<'de> Visitor<'de> for DocumentVisitor {
			type Value = IniDocument;

			fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
				formatter.write_str("INI sections")
			}

			fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
			where
				A: MapAccess<'de>,
			{
				let mut sections = Vec::new();
				while let Some((name, options)) = map.next_entry::<String, SectionOptions>()? {
					sections.push(Section {
						name,
						options: options.0,
					});
				}
				Ok(IniDocument(sections))
			}
		}

		deserializer.deserialize_map(DocumentVisitor)
	}
}

struct SectionOptions(Vec<(String, String)>);

impl<'de> Deserialize<'de> for SectionOptions {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		struct OptionsVisitor;

		impl<'de> Visitor<'de> for OptionsVisitor {
			type Value = SectionOptions;

			fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
				formatter.write_str("a section of `key = value` options")
			}

			fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
			where
				A: MapAccess<'de>,
			{
				let mut options = Vec::new();
				while let Some(entry) = map.next_entry::<String, String>()? {
					options.push(entry);
				}
				Ok(SectionOptions(options))
			}
		}

		deserializer.deserialize_map(OptionsVisitor)
	}
}

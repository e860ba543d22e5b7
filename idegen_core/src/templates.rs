use std::path::Path;
use std::path::PathBuf;

use ignore::WalkBuilder;

use crate::IdegenError;
use crate::IdegenResult;
use crate::TemplateVariables;

/// Extension marking a file as a template. It is stripped from the output
/// file name.
pub const TEMPLATE_EXTENSION: &str = ".tpl";

/// A template file discovered under an IDE's template directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateEntry {
	/// Directory of the template relative to the IDE's template directory.
	/// Empty for templates at its root.
	pub subdir: PathBuf,
	/// Full path to the template file.
	pub template_path: PathBuf,
}

impl TemplateEntry {
	/// The template's file name without [`TEMPLATE_EXTENSION`].
	pub fn output_file_name(&self) -> IdegenResult<String> {
		let file_name = self
			.template_path
			.file_name()
			.map(|name| name.to_string_lossy().to_string())
			.unwrap_or_default();

		match file_name.strip_suffix(TEMPLATE_EXTENSION) {
			Some(stem) if !stem.is_empty() => Ok(stem.to_string()),
			_ => Err(IdegenError::InvalidTemplateName(file_name.clone())),
		}
	}
}

/// List the IDE identifiers available in `templates_dir`: the names of its
/// subdirectories, sorted and without duplicates.
pub fn supported_ides(templates_dir: &Path) -> IdegenResult<Vec<String>> {
	if !templates_dir.is_dir() {
		return Err(IdegenError::TemplatesDirMissing(
			templates_dir.display().to_string(),
		));
	}

	let mut ides = Vec::new();
	for entry in std::fs::read_dir(templates_dir)? {
		let entry = entry?;
		if entry.path().is_dir() {
			ides.push(entry.file_name().to_string_lossy().to_string());
		}
	}

	ides.sort();
	ides.dedup();
	Ok(ides)
}

/// Check `ide` against [`supported_ides`].
pub fn ensure_supported_ide(templates_dir: &Path, ide: &str) -> IdegenResult<()> {
	let supported = supported_ides(templates_dir)?;
	if supported.iter().any(|name| name == ide) {
		return Ok(());
	}

	Err(IdegenError::UnknownIde {
		ide: ide.to_string(),
		supported: supported.join(", "),
	})
}

/// Recursively collect every `*.tpl` file below `ide_dir`, hidden files
/// included, in file name order within each directory.
pub fn collect_templates(ide_dir: &Path) -> IdegenResult<Vec<TemplateEntry>> {
	let walker = WalkBuilder::new(ide_dir)
		.standard_filters(false)
		.sort_by_file_name(|a, b| a.cmp(b))
		.build();

	let mut templates = Vec::new();
	for result in walker {
		let entry = result.map_err(|e| {
			IdegenError::Walk {
				path: ide_dir.display().to_string(),
				reason: e.to_string(),
			}
		})?;

		if !entry.file_type().is_some_and(|kind| kind.is_file()) {
			continue;
		}

		let path = entry.path();
		let is_template = path
			.file_name()
			.and_then(|name| name.to_str())
			.is_some_and(|name| name.ends_with(TEMPLATE_EXTENSION));
		if !is_template {
			continue;
		}

		let subdir = path
			.parent()
			.and_then(|parent| parent.strip_prefix(ide_dir).ok())
			.map(Path::to_path_buf)
			.unwrap_or_default();

		templates.push(TemplateEntry {
			subdir,
			template_path: path.to_path_buf(),
		});
	}

	tracing::debug!(dir = %ide_dir.display(), count = templates.len(), "collected templates");
	Ok(templates)
}

/// Render template text with `variables` through minijinja. Text without
/// template syntax is returned unchanged.
pub fn render_template(
	name: &str,
	content: &str,
	variables: &TemplateVariables,
) -> IdegenResult<String> {
	if !has_template_syntax(content) {
		return Ok(content.to_string());
	}

	let render_error = |e: minijinja::Error| {
		IdegenError::TemplateRender {
			template: name.to_string(),
			reason: e.to_string(),
		}
	};

	let mut env = minijinja::Environment::new();
	env.set_keep_trailing_newline(true);
	env.set_undefined_behavior(minijinja::UndefinedBehavior::Chainable);
	env.set_auto_escape_callback(|_| minijinja::AutoEscape::None);
	env.add_filter("include_dirs", include_dirs);
	env.add_template(name, content).map_err(render_error)?;

	let template = env.get_template(name).map_err(render_error)?;
	let ctx = minijinja::Value::from_serialize(variables);
	template.render(ctx).map_err(render_error)
}

/// Template filter flattening `includes` into one list of paths. Accepts a
/// list of paths or an object mapping group names to lists of paths.
fn include_dirs(value: minijinja::Value) -> Result<Vec<minijinja::Value>, minijinja::Error> {
	if value.is_undefined() || value.is_none() {
		return Ok(Vec::new());
	}

	if value.kind() != minijinja::value::ValueKind::Map {
		return Ok(value.try_iter()?.collect());
	}

	let mut dirs = Vec::new();
	for group in value.try_iter()? {
		dirs.extend(value.get_item(&group)?.try_iter()?);
	}
	Ok(dirs)
}

/// Check whether content contains minijinja template syntax.
fn has_template_syntax(content: &str) -> bool {
	content.contains("{{") || content.contains("{%") || content.contains("{#")
}

use std::cell::OnceCell;
use std::path::Path;
use std::path::PathBuf;

use ignore::WalkBuilder;

use crate::BuildMetadata;
use crate::BuildRunner;
use crate::DerivedFacts;
use crate::ENV_NAME_KEY;
use crate::EnvironmentSettings;
use crate::IdegenError;
use crate::IdegenResult;
use crate::PathEscaping;
use crate::PlatformioRunner;
use crate::ProjectConfig;
use crate::TemplateEntry;
use crate::TemplateVariables;
use crate::collect_templates;
use crate::config::ResolvedSettings;
use crate::ensure_supported_ide;
use crate::extract_build_data;
use crate::host_path_separator;
use crate::host_systype;
use crate::render_template;

/// Output file that is never overwritten once it exists.
pub const PRESERVED_FILE_NAME: &str = ".gitignore";

/// What to generate, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
	pub project_dir: PathBuf,
	pub ide: String,
	pub env_name: String,
}

impl GenerationRequest {
	pub fn new(
		project_dir: impl Into<PathBuf>,
		ide: impl Into<String>,
		env_name: impl Into<String>,
	) -> Self {
		Self {
			project_dir: project_dir.into(),
			ide: ide.into(),
			env_name: env_name.into(),
		}
	}
}

/// What happened to one output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
	Written,
	/// The file is an existing `.gitignore` and was left untouched.
	SkippedExisting,
	/// Rendered during a dry run; nothing was written.
	Planned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
	pub path: PathBuf,
	pub outcome: WriteOutcome,
	/// The rendered template, whether or not it was written.
	pub content: String,
}

/// Result of a generation run, one entry per template in template order.
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
	pub files: Vec<GeneratedFile>,
}

impl GenerationReport {
	pub fn count(&self, outcome: WriteOutcome) -> usize {
		self.files
			.iter()
			.filter(|file| file.outcome == outcome)
			.count()
	}
}

/// Generates one IDE's configuration files for one project environment.
///
/// Construction gathers every template variable up front, which runs the
/// build tool when the environment exists. A generator serves a single run.
pub struct ProjectGenerator<R = PlatformioRunner> {
	request: GenerationRequest,
	templates_dir: PathBuf,
	runner: R,
	project_config: ProjectConfig,
	path_escaping: PathEscaping,
	env: OnceCell<EnvironmentSettings>,
	variables: TemplateVariables,
}

impl ProjectGenerator<PlatformioRunner> {
	/// Create a generator that runs the configured PlatformIO executable.
	pub fn with_settings(request: GenerationRequest, settings: &ResolvedSettings) -> IdegenResult<Self> {
		Self::new(
			request,
			settings.templates_dir.clone(),
			PlatformioRunner::new(settings.build_tool.clone()),
		)
	}
}

impl<R: BuildRunner> ProjectGenerator<R> {
	/// The request's project directory is made absolute against the current
	/// directory.
	pub fn new(
		mut request: GenerationRequest,
		templates_dir: impl Into<PathBuf>,
		runner: R,
	) -> IdegenResult<Self> {
		request.project_dir = std::path::absolute(&request.project_dir)?;
		let templates_dir = templates_dir.into();
		ensure_supported_ide(&templates_dir, &request.ide)?;
		let project_config = ProjectConfig::load(&request.project_dir)?;

		let mut generator = Self {
			request,
			templates_dir,
			runner,
			project_config,
			path_escaping: PathEscaping::for_host(),
			env: OnceCell::new(),
			variables: TemplateVariables::default(),
		};
		generator.variables = generator.gather_variables()?;

		Ok(generator)
	}

	pub fn request(&self) -> &GenerationRequest {
		&self.request
	}

	pub fn project_config(&self) -> &ProjectConfig {
		&self.project_config
	}

	/// Every variable the templates are rendered with.
	pub fn variables(&self) -> &TemplateVariables {
		&self.variables
	}

	/// Settings of the requested environment, or an empty mapping when the
	/// project has no such environment. Computed once per generator.
	pub fn project_env(&self) -> &EnvironmentSettings {
		self.env.get_or_init(|| {
			let env_name = &self.request.env_name;
			let Some(mut items) = self.project_config.env_items(env_name) else {
				tracing::debug!(env = %env_name, "environment not found in project config");
				return EnvironmentSettings::default();
			};

			items.insert(ENV_NAME_KEY.to_string(), env_name.clone());
			EnvironmentSettings::new(items)
		})
	}

	/// Run the build tool's idedata dump for the environment. Without
	/// environment settings the empty shape is returned and nothing runs.
	pub fn project_build_data(&self) -> IdegenResult<BuildMetadata> {
		let Some(env_name) = self.project_env().env_name() else {
			return Ok(BuildMetadata::default());
		};

		let output = self
			.runner
			.run_idedata(&self.request.project_dir, env_name)?;
		extract_build_data(&output)
	}

	/// Last path segment of the project directory.
	pub fn project_name(&self) -> String {
		let project_dir = &self.request.project_dir;
		project_dir
			.file_name()
			.map(|name| name.to_string_lossy().to_string())
			.or_else(|| {
				project_dir
					.canonicalize()
					.ok()
					.and_then(|dir| dir.file_name().map(|name| name.to_string_lossy().to_string()))
			})
			.unwrap_or_default()
	}

	/// Every file under the project's source directory, relative to the
	/// project directory, in walk order.
	pub fn src_files(&self) -> IdegenResult<Vec<PathBuf>> {
		let project_dir = &self.request.project_dir;
		let src_dir = project_dir.join(self.project_config.src_dir());
		if !src_dir.is_dir() {
			return Ok(Vec::new());
		}

		let mut files = Vec::new();
		for result in WalkBuilder::new(&src_dir).standard_filters(false).build() {
			let entry = result.map_err(|e| {
				IdegenError::Walk {
					path: src_dir.display().to_string(),
					reason: e.to_string(),
				}
			})?;

			if !entry.file_type().is_some_and(|kind| kind.is_file()) {
				continue;
			}

			let path = entry.path();
			files.push(
				path.strip_prefix(project_dir)
					.map_or_else(|_| path.to_path_buf(), Path::to_path_buf),
			);
		}

		Ok(files)
	}

	/// Templates of the requested IDE.
	pub fn templates(&self) -> IdegenResult<Vec<TemplateEntry>> {
		collect_templates(&self.templates_dir.join(&self.request.ide))
	}

	/// Render every template and write it below the project directory.
	///
	/// Files are written one at a time; an error stops the run and leaves
	/// earlier files in place.
	pub fn generate(&self) -> IdegenResult<GenerationReport> {
		self.process(true)
	}

	/// Render every template without touching the file system.
	pub fn dry_run(&self) -> IdegenResult<GenerationReport> {
		self.process(false)
	}

	fn process(&self, write: bool) -> IdegenResult<GenerationReport> {
		let mut report = GenerationReport::default();

		for entry in self.templates()? {
			let dst_dir = self.request.project_dir.join(&entry.subdir);
			if write && !dst_dir.is_dir() {
				std::fs::create_dir_all(&dst_dir)?;
			}

			let dst_path = dst_dir.join(entry.output_file_name()?);
			let template_name = entry
				.template_path
				.strip_prefix(&self.templates_dir)
				.unwrap_or(&entry.template_path)
				.display()
				.to_string();
			let content = std::fs::read_to_string(&entry.template_path)?;
			let rendered = render_template(&template_name, &content, &self.variables)?;

			let outcome = if is_preserved(&dst_path) {
				tracing::info!(path = %dst_path.display(), "keeping existing file");
				WriteOutcome::SkippedExisting
			} else if write {
				std::fs::write(&dst_path, &rendered)?;
				tracing::info!(path = %dst_path.display(), "wrote file");
				WriteOutcome::Written
			} else {
				WriteOutcome::Planned
			};

			report.files.push(GeneratedFile {
				path: dst_path,
				outcome,
				content: rendered,
			});
		}

		Ok(report)
	}

	fn gather_variables(&self) -> IdegenResult<TemplateVariables> {
		let environment = self.project_env().clone();
		let build = self.project_build_data()?;
		let derived = self.derived_facts()?;

		TemplateVariables::from_layers(&environment, &build, &derived)
	}

	fn derived_facts(&self) -> IdegenResult<DerivedFacts> {
		let project_dir = &self.request.project_dir;
		let src_files = self
			.src_files()?
			.iter()
			.map(|path| path.display().to_string())
			.collect();
		let user_home_dir = dirs::home_dir()
			.map(|dir| dir.display().to_string())
			.unwrap_or_default();
		let env_path = std::env::var_os("PATH")
			.map(|path| path.to_string_lossy().to_string())
			.unwrap_or_default();
		let program = self.runner.program().display().to_string();

		Ok(DerivedFacts {
			project_name: self.project_name(),
			src_files,
			user_home_dir,
			project_dir: project_dir.display().to_string(),
			project_src_dir: display_joined(project_dir, &self.project_config.src_dir()),
			project_lib_dir: display_joined(project_dir, &self.project_config.lib_dir()),
			project_libdeps_dir: display_joined(project_dir, &self.project_config.libdeps_dir()),
			systype: host_systype(),
			platformio_path: self.path_escaping.apply(&program),
			env_pathsep: host_path_separator().to_string(),
			env_path: self.path_escaping.apply(&env_path),
		})
	}
}

/// Whether `path` is an existing file that generation must not replace.
pub fn is_preserved(path: &Path) -> bool {
	path.file_name()
		.is_some_and(|name| name == PRESERVED_FILE_NAME)
		&& path.is_file()
}

fn display_joined(base: &Path, path: &Path) -> String {
	base.join(path).display().to_string()
}

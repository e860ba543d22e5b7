use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum IdegenError {
	#[error(transparent)]
	#[diagnostic(code(idegen::io_error))]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	#[diagnostic(code(idegen::json))]
	Json(#[from] serde_json::Error),

	#[error("failed to walk `{path}`: {reason}")]
	#[diagnostic(code(idegen::walk))]
	Walk { path: String, reason: String },

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(idegen::config_parse),
		help("check that idegen.toml is valid TOML with `templates_dir` and/or `build_tool` keys")
	)]
	ConfigParse(String),

	#[error("failed to parse `{path}`: {reason}")]
	#[diagnostic(
		code(idegen::project_config_parse),
		help("check that platformio.ini is a valid INI file with `[env:NAME]` sections")
	)]
	ProjectConfigParse { path: String, reason: String },

	#[error("unsupported IDE `{ide}`")]
	#[diagnostic(
		code(idegen::unknown_ide),
		help("supported IDEs: {supported}")
	)]
	UnknownIde { ide: String, supported: String },

	#[error("template directory not found: `{0}`")]
	#[diagnostic(
		code(idegen::templates_dir_missing),
		help("pass `--templates DIR`, set IDEGEN_TEMPLATES_DIR, or set `templates_dir` in idegen.toml")
	)]
	TemplatesDirMissing(String),

	#[error("failed to start build tool `{program}`: {reason}")]
	#[diagnostic(
		code(idegen::build_tool_spawn),
		help("install PlatformIO Core or pass `--build-tool PATH`")
	)]
	BuildToolSpawn { program: String, reason: String },

	#[error("build tool `{program}` terminated abnormally: {reason}")]
	#[diagnostic(code(idegen::build_invocation))]
	BuildInvocation { program: String, reason: String },

	#[error("build tool did not produce IDE data\n{output}")]
	#[diagnostic(
		code(idegen::malformed_build_output),
		help("run `platformio run --target idedata` for this environment to inspect the failure")
	)]
	MalformedBuildOutput {
		output: String,
		/// Non-zero exit code reported by the build tool, if any.
		exit_code: Option<i32>,
	},

	#[error("template rendering failed for `{template}`: {reason}")]
	#[diagnostic(code(idegen::template_render))]
	TemplateRender { template: String, reason: String },

	#[error("template file name `{0}` does not end with `.tpl`")]
	#[diagnostic(code(idegen::invalid_template_name))]
	InvalidTemplateName(String),
}

impl IdegenError {
	/// The exit code the build tool reported when this error originates from
	/// a failed build run.
	pub fn build_exit_code(&self) -> Option<i32> {
		match self {
			Self::MalformedBuildOutput { exit_code, .. } => *exit_code,
			_ => None,
		}
	}
}

pub type IdegenResult<T> = Result<T, IdegenError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Generate IDE project files for PlatformIO projects.",
	long_about = "idegen reads a PlatformIO project's `platformio.ini`, asks PlatformIO for the \
	              compiler data of one environment, and renders a set of IDE templates into the \
	              project.\n\nQuick start:\n  idegen ides                  List supported IDEs\n  \
	              idegen envs                  List project environments\n  idegen generate \
	              --ide vscode  Write IDE files for the default environment"
)]
pub struct IdegenCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the PlatformIO project directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,

	/// Directory containing one template subdirectory per IDE. Defaults to
	/// `templates_dir` from `idegen.toml`, then the bundled templates.
	#[arg(long, global = true, env = "IDEGEN_TEMPLATES_DIR")]
	pub templates: Option<PathBuf>,

	/// PlatformIO executable used to extract IDE data. Defaults to
	/// `build_tool` from `idegen.toml`, then `platformio` or `pio` on `PATH`.
	#[arg(long, global = true, env = "IDEGEN_BUILD_TOOL")]
	pub build_tool: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
	/// List the IDE identifiers the template directory supports.
	Ides,
	/// List the environments defined in `platformio.ini`.
	Envs,
	/// Generate IDE project files.
	///
	/// Runs `platformio run --target idedata` for the environment, renders
	/// every template of the IDE, and writes the results below the project
	/// directory. An existing `.gitignore` is never overwritten.
	Generate {
		/// IDE to generate files for. See `idegen ides`.
		#[arg(long, short)]
		ide: String,

		/// Environment to read build data from. Defaults to the first entry
		/// of `default_envs`, then the first `[env:NAME]` section.
		#[arg(long, short)]
		environment: Option<String>,

		/// Render templates and report what would be written without
		/// touching any file.
		#[arg(long, default_value_t = false)]
		dry_run: bool,

		/// With `--dry-run`, show a diff against files that already exist.
		#[arg(long, default_value_t = false, requires = "dry_run")]
		diff: bool,
	},
	/// Print the variables templates are rendered with.
	Variables {
		/// IDE whose templates the variables are gathered for.
		#[arg(long, short)]
		ide: String,

		/// Environment to read build data from. Defaults like `generate`.
		#[arg(long, short)]
		environment: Option<String>,

		/// Output format. Use `text` for `name = value` lines or `json` for
		/// a single JSON object.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}

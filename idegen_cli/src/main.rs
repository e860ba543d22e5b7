use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use idegen_cli::Commands;
use idegen_cli::IdegenCli;
use idegen_cli::OutputFormat;
use idegen_core::AnyEmptyResult;
use idegen_core::AnyResult;
use idegen_core::GenerationReport;
use idegen_core::GenerationRequest;
use idegen_core::IdegenError;
use idegen_core::ProjectConfig;
use idegen_core::ProjectGenerator;
use idegen_core::WriteOutcome;
use idegen_core::config::ResolvedSettings;
use idegen_core::config::SettingsOverrides;
use idegen_core::supported_ides;
use owo_colors::OwoColorize;
use similar::ChangeTag;
use similar::TextDiff;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives.
const LOG_ENV: &str = "IDEGEN_LOG";

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = IdegenCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	init_tracing(args.verbose, use_color);

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match &args.command {
		Some(Commands::Ides) => run_ides(&args),
		Some(Commands::Envs) => run_envs(&args),
		Some(Commands::Generate {
			ide,
			environment,
			dry_run,
			diff,
		}) => run_generate(&args, ide, environment.as_deref(), *dry_run, *diff),
		Some(Commands::Variables {
			ide,
			environment,
			format,
		}) => run_variables(&args, ide, environment.as_deref(), *format),
		None => {
			eprintln!("No subcommand specified. Run `idegen --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		// Build failures exit with the build tool's own code.
		match e.downcast::<IdegenError>() {
			Ok(idegen_err) => {
				let code = idegen_err.build_exit_code().unwrap_or(2);
				let report: miette::Report = (*idegen_err).into();
				eprintln!("{report:?}");
				process::exit(code);
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Log to stderr. `IDEGEN_LOG` takes filter directives; without it only
/// warnings are shown, or debug output with `--verbose`.
fn init_tracing(verbose: bool, use_color: bool) {
	let filter = EnvFilter::try_from_env(LOG_ENV)
		.unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.without_time()
		.init();
}

fn resolve_root(args: &IdegenCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn resolve_settings(args: &IdegenCli) -> Result<ResolvedSettings, IdegenError> {
	let overrides = SettingsOverrides {
		templates_dir: args.templates.clone(),
		build_tool: args.build_tool.clone(),
	};
	ResolvedSettings::resolve(&resolve_root(args), &overrides)
}

/// The requested environment, or the project's default one.
fn resolve_env_name(root: &Path, environment: Option<&str>) -> AnyResult<String> {
	if let Some(name) = environment {
		return Ok(name.to_string());
	}

	let config = ProjectConfig::load(root)?;
	config.default_env_name().ok_or_else(|| {
		format!(
			"no environment given and `{}` defines none; pass `--environment NAME`",
			root.join(idegen_core::PROJECT_CONFIG_FILE).display()
		)
		.into()
	})
}

fn build_generator(
	args: &IdegenCli,
	ide: &str,
	environment: Option<&str>,
) -> AnyResult<ProjectGenerator> {
	let root = resolve_root(args);
	let settings = resolve_settings(args)?;
	let env_name = resolve_env_name(&root, environment)?;

	if args.verbose {
		eprintln!("Templates:  {}", settings.templates_dir.display());
		eprintln!("Build tool: {}", settings.build_tool.display());
		eprintln!("Env:        {env_name}");
	}

	let request = GenerationRequest::new(root, ide, env_name);
	Ok(ProjectGenerator::with_settings(request, &settings)?)
}

fn run_ides(args: &IdegenCli) -> AnyEmptyResult {
	let settings = resolve_settings(args)?;
	for ide in supported_ides(&settings.templates_dir)? {
		println!("{ide}");
	}

	Ok(())
}

fn run_envs(args: &IdegenCli) -> AnyEmptyResult {
	let root = resolve_root(args);
	let config = ProjectConfig::load(&root)?;
	let Some(config_path) = config.path() else {
		eprintln!("No {} found in {}.", idegen_core::PROJECT_CONFIG_FILE, root.display());
		return Ok(());
	};

	let envs = config.envs();
	if envs.is_empty() {
		eprintln!("No environments found in {}.", config_path.display());
		return Ok(());
	}

	for env in envs {
		println!("{env}");
	}

	Ok(())
}

fn run_generate(
	args: &IdegenCli,
	ide: &str,
	environment: Option<&str>,
	dry_run: bool,
	diff: bool,
) -> AnyEmptyResult {
	let generator = build_generator(args, ide, environment)?;
	let root = &generator.request().project_dir;
	let env_name = &generator.request().env_name;

	if dry_run {
		let report = generator.dry_run()?;
		print_report(&report, root);
		if diff {
			print_diffs(&report, root);
		}
		println!(
			"Dry run: would write {} file(s) for `{ide}` ({env_name}).",
			report.count(WriteOutcome::Planned)
		);
		return Ok(());
	}

	let report = generator.generate()?;
	print_report(&report, root);
	println!(
		"{}",
		colored!(
			format!(
				"Generated {} file(s) for `{ide}` ({env_name}).",
				report.count(WriteOutcome::Written)
			),
			green
		)
	);

	Ok(())
}

fn run_variables(
	args: &IdegenCli,
	ide: &str,
	environment: Option<&str>,
	format: OutputFormat,
) -> AnyEmptyResult {
	let generator = build_generator(args, ide, environment)?;
	let variables = generator.variables();

	match format {
		OutputFormat::Json => {
			println!("{}", serde_json::to_string_pretty(variables)?);
		}
		OutputFormat::Text => {
			for (name, value) in variables.iter() {
				let value = match value {
					serde_json::Value::String(text) => text.clone(),
					other => other.to_string(),
				};
				println!("{} = {value}", colored!(name, bold));
			}
		}
	}

	Ok(())
}

fn print_report(report: &GenerationReport, root: &Path) {
	for file in &report.files {
		let rel = make_relative(&file.path, root);
		match file.outcome {
			WriteOutcome::Written => println!("  {} {rel}", colored!("wrote", green)),
			WriteOutcome::SkippedExisting => {
				println!("  {} {rel} (already exists)", colored!("kept", yellow));
			}
			WriteOutcome::Planned => println!("  would write {rel}"),
		}
	}
}

/// Print a diff for every planned file that already exists with different
/// content.
fn print_diffs(report: &GenerationReport, root: &Path) {
	for file in &report.files {
		if file.outcome != WriteOutcome::Planned {
			continue;
		}

		let Ok(current) = std::fs::read_to_string(&file.path) else {
			continue;
		};
		if current == file.content {
			continue;
		}

		println!();
		println!("{}", colored!(make_relative(&file.path, root), bold));
		print_diff(&current, &file.content);
	}
}

/// Print a unified diff between two strings, colorized.
fn print_diff(current: &str, expected: &str) {
	let diff = TextDiff::from_lines(current, expected);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				print!("  {}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				print!("  {}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				print!("   {change}");
			}
		}
	}
}

/// Make a path relative to root for display purposes.
fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}

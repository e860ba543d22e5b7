use std::cell::RefCell;
use std::path::Path;
use std::path::PathBuf;

use crate::BuildOutput;
use crate::BuildRunner;
use crate::IdegenResult;

pub const FAKE_PROGRAM: &str = "/opt/fake/platformio";

pub const SAMPLE_IDEDATA: &str =
	r#"{"includes": ["/a/b"], "defines": [], "cxx_path": "/usr/bin/g++", "prog_path": null}"#;

pub const SAMPLE_PROJECT_CONFIG: &str = "\
[platformio]
default_envs = uno

[env]
framework = arduino

[env:uno]
platform = atmelavr
board = uno
";

/// A [`BuildRunner`] that returns canned output and records each call.
pub struct FakeRunner {
	program: PathBuf,
	exit_code: Option<i32>,
	stdout: String,
	stderr: String,
	pub calls: RefCell<Vec<(PathBuf, String)>>,
}

impl FakeRunner {
	pub fn new(exit_code: Option<i32>, stdout: impl Into<String>) -> Self {
		Self {
			program: PathBuf::from(FAKE_PROGRAM),
			exit_code,
			stdout: stdout.into(),
			stderr: String::new(),
			calls: RefCell::new(Vec::new()),
		}
	}

	/// A successful run printing some build noise followed by
	/// [`SAMPLE_IDEDATA`].
	pub fn succeeding() -> Self {
		Self::new(
			Some(0),
			format!("Processing uno (platform: atmelavr)\n{SAMPLE_IDEDATA}\n"),
		)
	}

	pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
		self.stderr = stderr.into();
		self
	}

	pub fn call_count(&self) -> usize {
		self.calls.borrow().len()
	}
}

impl BuildRunner for FakeRunner {
	fn run_idedata(&self, project_dir: &Path, env_name: &str) -> IdegenResult<BuildOutput> {
		self.calls
			.borrow_mut()
			.push((project_dir.to_path_buf(), env_name.to_string()));

		Ok(BuildOutput {
			program: FAKE_PROGRAM.to_string(),
			exit_code: self.exit_code,
			stdout: self.stdout.clone(),
			stderr: self.stderr.clone(),
		})
	}

	fn program(&self) -> &Path {
		&self.program
	}
}

/// Write `content` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: &str) {
	let path = root.join(relative);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).unwrap_or_else(|e| panic!("create_dir_all: {e}"));
	}
	std::fs::write(&path, content).unwrap_or_else(|e| panic!("write {}: {e}", path.display()));
}

pub fn read_file(root: &Path, relative: &str) -> String {
	let path = root.join(relative);
	std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
}

/// A project directory containing [`SAMPLE_PROJECT_CONFIG`] and one source
/// file.
pub fn sample_project(root: &Path) -> PathBuf {
	let project_dir = root.join("blink");
	write_file(&project_dir, "platformio.ini", SAMPLE_PROJECT_CONFIG);
	write_file(&project_dir, "src/main.cpp", "void setup() {}\nvoid loop() {}\n");
	project_dir
}

/// A template root with a `vscode` IDE holding a root-level `.gitignore`
/// template, a nested JSON template and a `foo/bar` template.
pub fn sample_templates(root: &Path) -> PathBuf {
	let templates_dir = root.join("templates");
	write_file(&templates_dir, "vscode/.gitignore.tpl", ".pio\n");
	write_file(
		&templates_dir,
		"vscode/.vscode/settings.json.tpl",
		"{\"env\": \"{{ env_name }}\", \"compiler\": \"{{ cxx_path }}\"}\n",
	);
	write_file(
		&templates_dir,
		"vscode/foo/bar.tpl",
		"{% for include in includes %}-I{{ include }}\n{% endfor %}",
	);
	write_file(&templates_dir, "vscode/README.md", "not a template\n");
	write_file(&templates_dir, "vim/.clang_complete.tpl", "{{ project_name }}\n");
	templates_dir
}

use common::*;
use predicates::prelude::*;

mod common;

#[test]
fn ides_lists_bundled_templates() {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));

	idegen_cmd()
		.arg("--path")
		.arg(tmp.path())
		.arg("ides")
		.assert()
		.success()
		.stdout("clion\nemacs\nvim\nvscode\n");
}

#[test]
fn ides_reads_templates_from_env() {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
	let templates_dir = sample_templates(tmp.path());
	std::fs::create_dir_all(templates_dir.join("atom"))
		.unwrap_or_else(|e| panic!("create_dir_all: {e}"));

	idegen_cmd()
		.arg("--path")
		.arg(tmp.path())
		.arg("ides")
		.env("IDEGEN_TEMPLATES_DIR", &templates_dir)
		.assert()
		.success()
		.stdout("atom\nvscode\n");
}

#[test]
fn ides_flag_beats_env() {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
	let templates_dir = sample_templates(tmp.path());

	idegen_cmd()
		.arg("--path")
		.arg(tmp.path())
		.arg("ides")
		.arg("--templates")
		.arg(&templates_dir)
		.env("IDEGEN_TEMPLATES_DIR", tmp.path().join("missing"))
		.assert()
		.success()
		.stdout("vscode\n");
}

#[test]
fn ides_reports_missing_template_root() {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));

	idegen_cmd()
		.arg("--path")
		.arg(tmp.path())
		.arg("ides")
		.arg("--templates")
		.arg(tmp.path().join("missing"))
		.assert()
		.code(2)
		.stderr(predicate::str::contains("template directory not found"));
}

#[test]
fn envs_lists_environments_in_file_order() {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
	let project_dir = sample_project(tmp.path());

	idegen_cmd()
		.arg("--path")
		.arg(&project_dir)
		.arg("envs")
		.assert()
		.success()
		.stdout("uno\nnative\n");
}

#[test]
fn envs_without_project_config() {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));

	idegen_cmd()
		.arg("--path")
		.arg(tmp.path())
		.arg("envs")
		.assert()
		.success()
		.stdout("")
		.stderr(predicate::str::contains("No platformio.ini found in"));
}

#[test]
fn envs_without_env_sections() {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
	write_file(tmp.path(), "platformio.ini", "[platformio]\nsrc_dir = source\n");

	idegen_cmd()
		.arg("--path")
		.arg(tmp.path())
		.arg("envs")
		.assert()
		.success()
		.stdout("")
		.stderr(predicate::str::contains("No environments found in"));
}

#[test]
fn generate_requires_an_environment() {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
	let templates_dir = sample_templates(tmp.path());

	idegen_cmd()
		.arg("--path")
		.arg(tmp.path())
		.arg("generate")
		.arg("--ide")
		.arg("vscode")
		.arg("--templates")
		.arg(&templates_dir)
		.assert()
		.code(2)
		.stderr(predicate::str::contains("pass `--environment NAME`"));
}

#[test]
fn no_subcommand_prints_usage_hint() {
	idegen_cmd()
		.assert()
		.code(1)
		.stderr(predicate::str::contains("idegen --help"));
}

// ABOUTME: Integration tests for the CLI application
// ABOUTME: Runs the bosun binary against temporary experiment files on the local machine

use std::process::{Command, Output};

mod common;
use common::{TestEnvironment, OCEAN_TEMPLATE};

fn bosun(env: &TestEnvironment, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bosun"))
        .args(args)
        .arg("--config")
        .arg(env.file("bosun.yaml"))
        .arg("--no-color")
        .env_remove("BOSUN_HOST")
        .env_remove("BOSUN_STRICT_OVERLAY")
        .env_remove("RUST_LOG")
        .current_dir(env.path())
        .output()
        .expect("Failed to execute bosun")
}

#[test]
fn test_cli_help_command() {
    let env = TestEnvironment::new();
    let output = bosun(&env, &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("bosun"));
    assert!(stdout.contains("run"));
    assert!(stdout.contains("namelist"));
}

#[test]
fn test_cli_list_tasks() {
    let env = TestEnvironment::new();
    let output = bosun(&env, &["list"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let names: Vec<&str> = stdout
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .collect();
    assert_eq!(names.len(), 11);
    assert_eq!(names[0], "prepare_namelist");
    assert_eq!(names[10], "run_post");
}

#[test]
fn test_cli_render_template() {
    let env = TestEnvironment::new();
    let environ = env.write("environ.yaml", "expdir: /exp\nworkdir: '{expdir}/work'\n");

    let output = bosun(
        &env,
        &[
            "render",
            "{workdir}/input.nml",
            "-e",
            environ.to_str().unwrap(),
            "-s",
            "expdir=/scratch/exp",
        ],
    );

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "/scratch/exp/work/input.nml"
    );
}

#[test]
fn test_cli_render_missing_key_fails() {
    let env = TestEnvironment::new();
    let output = bosun(&env, &["render", "{workdir}/input.nml"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("workdir"));
}

#[test]
fn test_cli_normalizes_namelist() {
    let env = TestEnvironment::new();
    let input = env.write("input.nml", "&ocean_model_nml layout=2,4, dt_ocean=1800 /\n");

    let output = bosun(&env, &["namelist", input.to_str().unwrap()]);

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "&ocean_model_nml\n    layout = 2, 4\n    dt_ocean = 1800\n/\n"
    );
}

#[test]
fn test_cli_prepares_namelist_locally() {
    let env = TestEnvironment::new();
    let template = env.write("template.nml", OCEAN_TEMPLATE);
    let workdir = env.path().join("work");
    std::fs::create_dir(&workdir).unwrap();

    let environ = env.write(
        "environ.yaml",
        &format!(
            r#"workdir: {}
npes: 32
dt_ocean: 1800
dt_atmos: 3600
dt_cpld: 3600
months: 2
mode: warm
restart: "2002070100"
ocean_namelist:
  file: {}
  vars:
    coupler_nml:
      calendar: noleap
"#,
            workdir.display(),
            template.display()
        ),
    );

    let output = bosun(
        &env,
        &["run", "prepare_namelist", "-e", environ.to_str().unwrap(), "--local"],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let written = std::fs::read_to_string(workdir.join("input.nml")).unwrap();
    assert!(written.contains("    months = 2\n"));
    assert!(!written.contains("days ="));
    assert!(written.contains("    current_date = 2002, 7, 1, 0, 0, 0\n"));
    assert!(written.contains("    calendar = 'noleap'\n"));
    assert!(written.contains("    layout = 4, 8\n"));
    assert!(written.contains("    dt_ocean = 1800\n"));
}

#[test]
fn test_cli_unknown_task_fails() {
    let env = TestEnvironment::new();
    let output = bosun(&env, &["run", "launch_rockets"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("launch_rockets"));
}

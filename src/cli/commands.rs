// ABOUTME: Command implementations for the bosun CLI
// ABOUTME: Handles the run, list, render, and namelist commands

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

use super::args::EnvironArgs;
use super::config::Config;
use crate::engine::{RunStatus, TaskContext};
use crate::environ::{EnvStore, EnvironBuilder};
use crate::namelist::{self, OverlayMode};
use crate::remote::{LocalRemote, Remote, SshRemote};
use crate::tasks::TaskRegistry;
use crate::template;

/// Compose the environment store: config defaults, config files, then the command line
pub fn build_store(environ: &EnvironArgs, config: &Config) -> Result<EnvStore> {
    let mut builder = EnvironBuilder::new().defaults(Value::Object(config.defaults.clone()));
    for file in config.environ_files.iter().chain(&environ.files) {
        builder = builder
            .file(file)
            .with_context(|| format!("Failed to load environment file {}", file.display()))?;
    }

    let store = builder.assignments(environ.set.as_slice())?.build()?;
    info!("Environment loaded with {} keys", store.len());
    Ok(store)
}

fn select_remote(host: Option<String>, local: bool, config: &Config) -> Box<dyn Remote> {
    match host.or_else(|| config.host.clone()) {
        Some(host) if !local => Box::new(SshRemote::new(host)),
        _ => Box::new(LocalRemote::new()),
    }
}

/// Execute tasks in order over one context
pub async fn run_tasks(
    tasks: Vec<String>,
    environ: EnvironArgs,
    host: Option<String>,
    local: bool,
    strict_overlay: bool,
    config: &Config,
) -> Result<()> {
    let store = build_store(&environ, config)?;
    let mode = OverlayMode::from_strict(strict_overlay || config.strict_overlay);
    let mut context = TaskContext::new(store).with_overlay_mode(mode);
    let remote = select_remote(host, local, config);

    info!(
        "Starting run {} on {}: {}",
        context.run_id,
        remote.describe(),
        tasks.join(", ")
    );

    let registry = TaskRegistry::new();
    let run = registry.run_all(tasks.as_slice(), &mut context, remote.as_ref()).await?;

    println!("Run {} completed with status: {:?}", run.run_id, run.status);
    for task_result in &run.tasks {
        println!("  Task '{}': {:?}", task_result.task_id, task_result.status);
        if let Some(ref error) = task_result.error {
            println!("    Error: {}", error);
        }
    }

    match run.status {
        RunStatus::Success => Ok(()),
        _ => Err(anyhow::anyhow!("Run failed with status: {:?}", run.status)),
    }
}

pub fn list_tasks() -> Result<()> {
    for (name, description) in TaskRegistry::new().list_supported_tasks() {
        println!("{:<20} {}", name, description);
    }
    Ok(())
}

pub fn render_template(text: &str, environ: EnvironArgs, config: &Config) -> Result<()> {
    let store = build_store(&environ, config)?;
    println!("{}", template::render(text, &store)?);
    Ok(())
}

/// Decode and re-encode a namelist file
pub fn normalize_namelist(file: &Path, output: Option<PathBuf>) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let document =
        namelist::decode(&text).with_context(|| format!("Failed to parse {}", file.display()))?;
    let encoded = namelist::encode(&document);

    match output {
        Some(path) => {
            std::fs::write(&path, encoded)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Namelist written to: {}", path.display());
        }
        None => print!("{}", encoded),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_build_store_precedence() {
        let temp_dir = tempdir().unwrap();
        let base = temp_dir.path().join("base.yaml");
        let exp = temp_dir.path().join("exp.yaml");
        fs::write(&base, "npes: 16\nplatform: cray\nexpdir: /exp\n").unwrap();
        fs::write(&exp, "npes: 32\nworkdir: '{expdir}/work'\n").unwrap();

        let mut config = Config::default();
        config.defaults = json!({"platform": "generic", "account": "ocean"})
            .as_object()
            .unwrap()
            .clone();
        config.environ_files = vec![base];
        let environ = EnvironArgs {
            files: vec![exp],
            set: vec!["npes=64".to_string()],
        };

        let store = build_store(&environ, &config).unwrap();
        assert_eq!(store.get_i64("npes").unwrap(), 64);
        assert_eq!(store.get_string("platform").unwrap(), "cray");
        assert_eq!(store.get_string("account").unwrap(), "ocean");
        assert_eq!(store.get_string("workdir").unwrap(), "/exp/work");
    }

    #[test]
    fn test_build_store_missing_file() {
        let environ = EnvironArgs {
            files: vec![PathBuf::from("/nonexistent/environ.yaml")],
            set: Vec::new(),
        };
        assert!(build_store(&environ, &Config::default()).is_err());
    }

    #[test]
    fn test_normalize_namelist() {
        let temp_dir = tempdir().unwrap();
        let input = temp_dir.path().join("input.nml");
        let output = temp_dir.path().join("out.nml");
        fs::write(&input, "&coupler_nml months=1, days=0 /\n").unwrap();

        normalize_namelist(&input, Some(output.clone())).unwrap();
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "&coupler_nml\n    months = 1\n    days = 0\n/\n"
        );
    }

    #[test]
    fn test_select_remote() {
        let mut config = Config::default();
        assert_eq!(select_remote(None, false, &config).describe(), "local");
        config.host = Some("cluster".to_string());
        assert_eq!(select_remote(None, false, &config).describe(), "ssh://cluster");
        assert_eq!(select_remote(None, true, &config).describe(), "local");
    }
}

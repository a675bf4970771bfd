// ABOUTME: Batch submission tasks for the model run and its post-processing
// ABOUTME: Records scheduler job ids in the environment store so later tasks can chain on them

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use super::TaskImplementation;
use crate::engine::error::{ExecutionError, Result};
use crate::engine::{TaskContext, TaskResult};
use crate::environ::scalar_to_string;
use crate::remote::{Remote, ShellSession};

const MODEL_JOB_MARKER: &str = "JobIDmodel:";
const DRIFTERS_FLAG: &str = "run_drifters_pos";

pub struct RunModelTask;

#[async_trait]
impl TaskImplementation for RunModelTask {
    async fn execute(&self, context: &mut TaskContext, remote: &dyn Remote) -> Result<TaskResult> {
        let mut result = TaskResult::new(self.task_type());
        result.mark_started();
        info!("Submitting ocean model");

        let output = {
            let mut shell = ShellSession::new();
            let mut env = shell.with_scope(
                &context.store,
                &[
                    "workdir",
                    "platform",
                    "walltime",
                    "datatable",
                    "diagtable",
                    "fieldtable",
                    "executable",
                    "mppnccombine",
                    "comb_exe",
                    "account",
                ],
            )?;
            let mut source = env.with_prefix(context.render("source {envconf}")?);
            let runscripts = source.with_cwd(context.render("{expdir}/runscripts")?);

            if context.store.flag(DRIFTERS_FLAG) {
                remote
                    .run_checked(&runscripts.command(". set_pos_drifters.cray"))
                    .await?;
            }

            let submit = runscripts.command(context.render(
                ". run_g4c_model.cray {mode} {start} {restart} {finish} {npes} {name}",
            )?);
            let output = remote.run_checked(&submit).await?;
            (submit.command_line(), output)
        };

        let (command, output) = output;
        let job_id = output
            .value_after(MODEL_JOB_MARKER)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ExecutionError::MissingOutput {
                command,
                marker: MODEL_JOB_MARKER.to_string(),
            })?
            .to_string();

        info!("Model job submitted: {}", job_id);
        context.set("JobID_model", job_id.clone());
        result.add_metadata("JobID_model", job_id.clone());
        Ok(result.succeed(Some(job_id)))
    }

    fn task_type(&self) -> &'static str {
        "run_model"
    }

    fn description(&self) -> &'static str {
        "Submit the ocean model job and record JobID_model"
    }
}

pub struct RunPostTask;

#[async_trait]
impl TaskImplementation for RunPostTask {
    async fn execute(&self, context: &mut TaskContext, remote: &dyn Remote) -> Result<TaskResult> {
        let mut result = TaskResult::new(self.task_type());
        result.mark_started();
        info!("Submitting ocean post-processing");

        let dependency = model_job(context);
        if dependency.is_none() {
            warn!("No JobID_model recorded; post-processing will not wait for the model");
        }

        let mut scripts = vec!["{workdir}/set_g4c_pos_m4g4.{platform}"];
        if context.store.flag(DRIFTERS_FLAG) {
            scripts.push("{workdir}/run_pos_drifters.{platform}");
        }

        let mut shell = ShellSession::new();
        let runscripts = shell.with_cwd(context.render("{expdir}/runscripts")?);

        let mut job_id = String::new();
        for script in scripts {
            let mut qsub = runscripts.command("qsub");
            if let Some(model) = &dependency {
                qsub = qsub.arg("-W").arg(format!("depend=afterok:{}", model));
            }
            let qsub = qsub.arg(context.render(script)?);

            let output = remote.run_checked(&qsub).await?;
            job_id = output
                .last_line()
                .ok_or_else(|| ExecutionError::MissingOutput {
                    command: qsub.command_line(),
                    marker: "job id".to_string(),
                })?
                .to_string();
            context.set("JobID_pos_ocean", job_id.clone());
        }

        info!("Post-processing job submitted: {}", job_id);
        result.add_metadata("JobID_pos_ocean", job_id.clone());
        Ok(result.succeed(Some(job_id)))
    }

    fn task_type(&self) -> &'static str {
        "run_post"
    }

    fn description(&self) -> &'static str {
        "Submit post-processing chained on the model job"
    }
}

fn model_job(context: &TaskContext) -> Option<String> {
    match context.store.get("JobID_model") {
        None | Some(Value::Null) => None,
        Some(value) => scalar_to_string(value).filter(|id| !id.trim().is_empty()),
    }
}

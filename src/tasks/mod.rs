// ABOUTME: Ocean-model run tasks: namelist preparation, builds, pre-processing, submission
// ABOUTME: Each task reads the environment store and drives the remote host through the Remote seam

pub mod compile;
pub mod namelist;
pub mod preprocess;
pub mod submit;

use async_trait::async_trait;
use indexmap::IndexMap;
use tracing::{error, info};

use crate::engine::error::{ExecutionError, Result};
use crate::engine::{RunResult, TaskContext, TaskResult, TaskStatus};
use crate::remote::Remote;

/// Shell used by the model's build and job scripts
pub(crate) const TCSH: &str = "/usr/bin/tcsh";

#[async_trait]
pub trait TaskImplementation: Send + Sync {
    async fn execute(&self, context: &mut TaskContext, remote: &dyn Remote) -> Result<TaskResult>;

    fn task_type(&self) -> &'static str;

    fn description(&self) -> &'static str;
}

pub struct TaskRegistry {
    implementations: IndexMap<String, Box<dyn TaskImplementation>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            implementations: IndexMap::new(),
        };

        registry.register(Box::new(namelist::PrepareNamelistTask));
        registry.register(Box::new(namelist::Regrid2dPrepareTask));
        registry.register(Box::new(compile::CompileModelTask));
        registry.register(Box::new(compile::CompilePostTask));
        registry.register(Box::new(compile::CompilePreTask));
        registry.register(Box::new(preprocess::GenerateGridTask));
        registry.register(Box::new(preprocess::Regrid3dTask));
        registry.register(Box::new(preprocess::Regrid2dTask));
        registry.register(Box::new(preprocess::MakeXgridsTask));
        registry.register(Box::new(submit::RunModelTask));
        registry.register(Box::new(submit::RunPostTask));

        registry
    }

    pub fn register(&mut self, implementation: Box<dyn TaskImplementation>) {
        let task_type = implementation.task_type().to_string();
        self.implementations.insert(task_type, implementation);
    }

    pub fn get_implementation(&self, task_type: &str) -> Option<&dyn TaskImplementation> {
        self.implementations.get(task_type).map(|imp| imp.as_ref())
    }

    /// Task names and descriptions in registration order
    pub fn list_supported_tasks(&self) -> Vec<(&str, &str)> {
        self.implementations
            .values()
            .map(|imp| (imp.task_type(), imp.description()))
            .collect()
    }

    pub async fn execute_task(
        &self,
        task_type: &str,
        context: &mut TaskContext,
        remote: &dyn Remote,
    ) -> Result<TaskResult> {
        match self.get_implementation(task_type) {
            Some(implementation) => implementation.execute(context, remote).await,
            None => Err(ExecutionError::TaskNotFound {
                name: task_type.to_string(),
            }),
        }
    }

    /// Run tasks in order over one context, stopping at the first failure.
    ///
    /// Unknown task names are rejected before anything runs. A failed task is
    /// recorded in the returned result; the context keeps whatever the tasks
    /// wrote before the failure.
    pub async fn run_all<S: AsRef<str>>(
        &self,
        tasks: &[S],
        context: &mut TaskContext,
        remote: &dyn Remote,
    ) -> Result<RunResult> {
        for name in tasks {
            if self.get_implementation(name.as_ref()).is_none() {
                return Err(ExecutionError::TaskNotFound {
                    name: name.as_ref().to_string(),
                });
            }
        }

        let mut run = RunResult::new(context.run_id.clone());
        for name in tasks {
            let name = name.as_ref();
            info!("Running task: {} on {}", name, remote.describe());

            match self.execute_task(name, context, remote).await {
                Ok(result) => run.add_task_result(result),
                Err(e) => {
                    error!("Task {} failed: {}", name, e);
                    let mut failed = TaskResult::new(name);
                    failed.mark_completed(TaskStatus::Failed, None, Some(e.to_string()));
                    run.add_task_result(failed);
                    break;
                }
            }
        }

        run.mark_completed();
        Ok(run)
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RunStatus;
    use crate::environ::EnvStore;
    use crate::remote::{CommandOutput, MockRemote};
    use serde_json::json;

    #[test]
    fn test_registry_lists_all_tasks() {
        let registry = TaskRegistry::new();
        let names: Vec<&str> = registry
            .list_supported_tasks()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(
            names,
            vec![
                "prepare_namelist",
                "regrid_2d_prepare",
                "compile_model",
                "compile_post",
                "compile_pre",
                "generate_grid",
                "regrid_3d",
                "regrid_2d",
                "make_xgrids",
                "run_model",
                "run_post",
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_task_rejected_before_running() {
        let registry = TaskRegistry::new();
        let remote = MockRemote::new();
        let mut ctx = TaskContext::new(EnvStore::new());

        let err = registry
            .run_all(&["compile_pre", "launch_rockets"], &mut ctx, &remote)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::TaskNotFound { name } if name == "launch_rockets"));
        assert!(remote.commands().await.is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_at_first_failure() {
        let registry = TaskRegistry::new();
        let remote = MockRemote::new();
        remote
            .respond("run_g4c_model", CommandOutput::new("submitted\n", 0))
            .await;
        let store = EnvStore::from_value(json!({
            "expdir": "/exp", "envconf": "/exp/env.conf", "workdir": "/w",
            "platform": "cray", "walltime": "01:00:00", "datatable": "dt",
            "diagtable": "dg", "fieldtable": "ft", "executable": "mom4",
            "mppnccombine": "comb", "comb_exe": "/exe/comb", "account": "acc",
            "mode": "cold", "start": "2001010100", "restart": "2001010100",
            "finish": "2001020100", "npes": 4, "name": "exp1"
        }))
        .unwrap();
        let mut ctx = TaskContext::new(store);

        let run = registry
            .run_all(&["run_model", "run_post"], &mut ctx, &remote)
            .await
            .unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.tasks.len(), 1);
        assert!(run.tasks[0].error.as_deref().unwrap().contains("JobIDmodel:"));
    }
}

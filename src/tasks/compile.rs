// ABOUTME: Build tasks for the ocean model, the post-processing combiner, and pre-processing tools
// ABOUTME: Run the model's mkmf/tcsh build scripts inside scoped shell environments

use async_trait::async_trait;
use tracing::info;

use super::{TaskImplementation, TCSH};
use crate::engine::error::Result;
use crate::engine::{TaskContext, TaskResult};
use crate::remote::{CommandSpec, Remote, ShellSession};

pub struct CompileModelTask;

#[async_trait]
impl TaskImplementation for CompileModelTask {
    async fn execute(&self, context: &mut TaskContext, remote: &dyn Remote) -> Result<TaskResult> {
        let mut result = TaskResult::new(self.task_type());
        result.mark_started();
        info!("Compiling ocean model");

        let mut shell = ShellSession::new();
        let mut env = shell.with_scope(
            &context.store,
            &["comp", "code_dir", "root", "type", "mkmf_template", "executable"],
        )?;
        let mut source = env.with_prefix(context.render("source {envconf}")?);
        let build = source.with_cwd(context.render("{execdir}")?);

        let spec = build
            .command(TCSH)
            .arg(context.render("{ocean_makeconf}")?);
        let output = remote.run_checked(&spec).await?;

        result.add_metadata("command", spec.command_line());
        Ok(result.succeed(Some(output.stdout)))
    }

    fn task_type(&self) -> &'static str {
        "compile_model"
    }

    fn description(&self) -> &'static str {
        "Build the ocean model executable"
    }
}

pub struct CompilePostTask;

#[async_trait]
impl TaskImplementation for CompilePostTask {
    async fn execute(&self, context: &mut TaskContext, remote: &dyn Remote) -> Result<TaskResult> {
        let mut result = TaskResult::new(self.task_type());
        result.mark_started();
        info!("Compiling post-processing combiner");

        {
            let mut shell = ShellSession::new();
            let mut env = shell.with_scope(&context.store, &["root", "platform"])?;
            let mut source = env.with_prefix(context.render("source {envconf}")?);
            let build = source.with_cwd(context.render("{comb_exe}")?);

            let spec = build
                .command("make")
                .arg("-f")
                .arg(context.render("{comb_src}/Make_combine")?);
            remote.run_checked(&spec).await?;
        }

        let copy = CommandSpec::new("cp")
            .arg(context.render("{root}/MOM4p1/src/shared/drifters/drifters_combine")?)
            .arg(context.render("{comb_exe}/")?);
        remote.run_checked(&copy).await?;

        Ok(result.succeed(None))
    }

    fn task_type(&self) -> &'static str {
        "compile_post"
    }

    fn description(&self) -> &'static str {
        "Build mppnccombine and install drifters_combine"
    }
}

/// A pre-processing tool built with its own mkmf configuration
struct PreTool {
    name: &'static str,
    flag: &'static str,
    keys: &'static [&'static str],
    makeconf: &'static str,
}

const PRE_TOOLS: &[PreTool] = &[
    PreTool {
        name: "gengrid",
        flag: "gengrid_run_this_module",
        keys: &["root", "platform", "mkmf_template", "executable_gengrid"],
        makeconf: "{gengrid_makeconf}",
    },
    PreTool {
        name: "regrid_3d",
        flag: "regrid_3d_run_this_module",
        keys: &["root", "mkmf_template", "executable_regrid_3d"],
        makeconf: "{regrid_3d_makeconf}",
    },
    PreTool {
        name: "regrid_2d",
        flag: "regrid_2d_run_this_module",
        keys: &["root", "mkmf_template", "executable_regrid_2d"],
        makeconf: "{regrid_2d_makeconf}",
    },
];

const MAKE_XGRIDS_FLAG: &str = "make_xgrids_run_this_module";

pub struct CompilePreTask;

#[async_trait]
impl TaskImplementation for CompilePreTask {
    async fn execute(&self, context: &mut TaskContext, remote: &dyn Remote) -> Result<TaskResult> {
        let mut result = TaskResult::new(self.task_type());
        result.mark_started();

        let mut built = Vec::new();
        let mut shell = ShellSession::new();

        if PRE_TOOLS.iter().any(|tool| context.store.flag(tool.flag)) {
            let mut source = shell.with_prefix(context.render("source {envconf}")?);
            for tool in PRE_TOOLS.iter().filter(|tool| context.store.flag(tool.flag)) {
                info!("Compiling pre-processing tool: {}", tool.name);
                let mut env = source.with_scope(&context.store, tool.keys)?;
                let build = env.with_cwd(context.render(&format!("{{execdir}}/{}", tool.name))?);
                let spec = build.command(TCSH).arg(context.render(tool.makeconf)?);
                remote.run_checked(&spec).await?;
                built.push(tool.name);
            }
        }

        if context.store.flag(MAKE_XGRIDS_FLAG) {
            info!("Compiling pre-processing tool: make_xgrids");
            let source = shell.with_prefix(context.render("source {make_xgrids_envconf}")?);

            let fix = source
                .command("sed")
                .args(["-i.bak", "-r", "-e", "s/^#define MAXLOCAL.*$/#define MAXLOCAL 1e8/g"])
                .arg(context.render("{make_xgrids_src}")?);
            remote.run_checked(&fix).await?;

            let compile = source.command(context.render(
                "cc -g -V -O -o {executable_make_xgrids} {make_xgrids_src} \
                 -I $NETCDF_DIR/include -L $NETCDF_DIR/lib -lnetcdf -lm \
                 -Duse_LARGEFILE -Duse_netCDF -DLARGE_FILE",
            )?);
            remote.run_checked(&compile).await?;
            built.push("make_xgrids");
        }

        if built.is_empty() {
            return Ok(result.skip("No pre-processing modules enabled"));
        }
        result.add_metadata("built", built.join(","));
        Ok(result.succeed(Some(format!("Built {}", built.join(", ")))))
    }

    fn task_type(&self) -> &'static str {
        "compile_pre"
    }

    fn description(&self) -> &'static str {
        "Build the enabled grid and regridding pre-processing tools"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TaskStatus;
    use crate::environ::EnvStore;
    use crate::remote::MockRemote;
    use serde_json::json;

    fn context(extra: serde_json::Value) -> TaskContext {
        let mut base = json!({
            "envconf": "/exp/env.conf",
            "execdir": "/exp/exec",
            "root": "/opt/mom4",
            "platform": "cray",
            "mkmf_template": "/opt/mom4/mkmf.cray",
            "executable_gengrid": "/exp/exec/gengrid/gengrid.exe",
            "gengrid_makeconf": "/exp/make_gengrid.csh",
            "make_xgrids_envconf": "/exp/xgrids.conf",
            "make_xgrids_src": "/opt/mom4/make_xgrids.c",
            "executable_make_xgrids": "/exp/exec/make_xgrids"
        });
        crate::environ::deep_merge(&mut base, extra);
        TaskContext::new(EnvStore::from_value(base).unwrap())
    }

    #[tokio::test]
    async fn test_compile_pre_nothing_enabled() {
        let remote = MockRemote::new();
        let mut ctx = context(json!({}));
        let result = CompilePreTask.execute(&mut ctx, &remote).await.unwrap();
        assert_eq!(result.status, TaskStatus::Skipped);
        assert!(remote.commands().await.is_empty());
    }

    #[tokio::test]
    async fn test_compile_pre_gengrid_and_xgrids() {
        let remote = MockRemote::new();
        let mut ctx = context(json!({
            "gengrid_run_this_module": true,
            "make_xgrids_run_this_module": true
        }));
        CompilePreTask.execute(&mut ctx, &remote).await.unwrap();

        let commands = remote.commands().await;
        assert_eq!(commands.len(), 3);

        let gengrid = &commands[0];
        assert_eq!(gengrid.command_line(), "/usr/bin/tcsh /exp/make_gengrid.csh");
        assert_eq!(gengrid.working_dir.as_deref(), Some("/exp/exec/gengrid"));
        assert_eq!(gengrid.prefixes, vec!["source /exp/env.conf".to_string()]);
        assert_eq!(
            gengrid.env.keys().collect::<Vec<_>>(),
            vec!["root", "platform", "mkmf_template", "executable_gengrid"]
        );

        let fix = &commands[1];
        assert!(fix.command_line().starts_with("sed -i.bak -r -e 's/^#define MAXLOCAL"));
        assert_eq!(fix.prefixes, vec!["source /exp/xgrids.conf".to_string()]);
        assert!(fix.env.is_empty());

        assert!(commands[2]
            .command_line()
            .starts_with("cc -g -V -O -o /exp/exec/make_xgrids /opt/mom4/make_xgrids.c"));
    }

    #[tokio::test]
    async fn test_compile_pre_missing_key_runs_nothing() {
        let remote = MockRemote::new();
        let mut ctx = context(json!({"regrid_3d_run_this_module": true}));
        assert!(CompilePreTask.execute(&mut ctx, &remote).await.is_err());
        assert!(remote.commands().await.is_empty());
    }
}

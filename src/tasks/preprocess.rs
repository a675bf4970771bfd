// ABOUTME: Grid generation and regridding tasks run through the experiment's mom4_pre scripts
// ABOUTME: Includes the exchange-grid builder, whose tool signals success with exit code 41

use async_trait::async_trait;
use tracing::{info, warn};

use super::namelist::prepare_regrid_2d;
use super::{TaskImplementation, TCSH};
use crate::engine::error::{ExecutionError, Result};
use crate::engine::{TaskContext, TaskResult};
use crate::remote::{CommandOutput, CommandSpec, Remote, ShellSession};

/// make_xgrids exits with 41 when it completes normally
const XGRIDS_SUCCESS: i32 = 41;

/// Run one of the `runscripts/mom4_pre` job scripts with `keys` exported
async fn run_pre_script(
    context: &TaskContext,
    remote: &dyn Remote,
    keys: &[&str],
    script: &str,
) -> Result<CommandOutput> {
    let mut shell = ShellSession::new();
    let mut env = shell.with_scope(&context.store, keys)?;
    let mut source = env.with_prefix(context.render("source {envconf}")?);
    let scripts = source.with_cwd(context.render("{expdir}/runscripts/mom4_pre")?);

    let spec = scripts.command(TCSH).arg(script);
    Ok(remote.run_checked(&spec).await?)
}

/// Append `{prefix}?.nc` tiles, if any, to grid_spec_UNION.nc
async fn merge_tiles(
    context: &TaskContext,
    remote: &dyn Remote,
    gengrid: &ShellSession,
    prefix: &str,
) -> Result<bool> {
    let pattern = context.render(&format!("{{workdir}}/gengrid/{}?.nc", prefix))?;
    if !remote.exists(&pattern).await? {
        warn!("No {}?.nc tiles to merge", prefix);
        return Ok(false);
    }

    let merge = format!(
        "for file in {}?.nc; do ncks -A $file grid_spec_UNION.nc; done",
        prefix
    );
    remote.run_checked(&gengrid.command(merge)).await?;
    Ok(true)
}

pub struct GenerateGridTask;

#[async_trait]
impl TaskImplementation for GenerateGridTask {
    async fn execute(&self, context: &mut TaskContext, remote: &dyn Remote) -> Result<TaskResult> {
        let mut result = TaskResult::new(self.task_type());
        result.mark_started();
        info!("Generating ocean grid");

        let copy = CommandSpec::new("cp")
            .arg(context.render("{topog_file}")?)
            .arg(context.render("{gengrid_workdir}/topog_file.nc")?);
        remote.run_checked(&copy).await?;

        let output = run_pre_script(
            context,
            remote,
            &[
                "mom4_pre_npes",
                "mom4_pre_walltime",
                "RUNTM",
                "executable_gengrid",
                "gengrid_workdir",
                "account",
                "topog_file",
                "platform",
            ],
            "ocean_grid_run.csh",
        )
        .await?;

        Ok(result.succeed(Some(output.stdout)))
    }

    fn task_type(&self) -> &'static str {
        "generate_grid"
    }

    fn description(&self) -> &'static str {
        "Generate the ocean grid from the topography file"
    }
}

pub struct Regrid3dTask;

#[async_trait]
impl TaskImplementation for Regrid3dTask {
    async fn execute(&self, context: &mut TaskContext, remote: &dyn Remote) -> Result<TaskResult> {
        let mut result = TaskResult::new(self.task_type());
        result.mark_started();
        info!("Regridding 3D initial conditions");

        let copy = CommandSpec::new("cp")
            .arg(context.render("{regrid_3d_src_file}")?)
            .arg(context.render("{regrid_3d_workdir}/src_file.nc")?);
        remote.run_checked(&copy).await?;

        let output = run_pre_script(
            context,
            remote,
            &[
                "mom4_pre_npes",
                "mom4_pre_walltime",
                "executable_regrid_3d",
                "regrid_3d_workdir",
                "regrid_3d_dest_grid",
                "regrid_3d_output_filename",
                "account",
                "platform",
            ],
            "regrid_3d_run.csh",
        )
        .await?;

        Ok(result.succeed(Some(output.stdout)))
    }

    fn task_type(&self) -> &'static str {
        "regrid_3d"
    }

    fn description(&self) -> &'static str {
        "Regrid 3D fields onto the model grid"
    }
}

pub struct Regrid2dTask;

#[async_trait]
impl TaskImplementation for Regrid2dTask {
    async fn execute(&self, context: &mut TaskContext, remote: &dyn Remote) -> Result<TaskResult> {
        let mut result = TaskResult::new(self.task_type());
        result.mark_started();

        let namelist = prepare_regrid_2d(context, remote).await?;
        result.add_metadata("namelist", namelist);

        info!("Regridding 2D fields");
        let output = run_pre_script(
            context,
            remote,
            &[
                "mom4_pre_npes",
                "mom4_pre_walltime",
                "executable_regrid_2d",
                "regrid_2d_workdir",
                "regrid_2d_src_file",
                "account",
                "platform",
            ],
            "regrid_2d_run.csh",
        )
        .await?;

        Ok(result.succeed(Some(output.stdout)))
    }

    fn task_type(&self) -> &'static str {
        "regrid_2d"
    }

    fn description(&self) -> &'static str {
        "Prepare the 2D regrid namelist and regrid 2D fields"
    }
}

pub struct MakeXgridsTask;

#[async_trait]
impl TaskImplementation for MakeXgridsTask {
    async fn execute(&self, context: &mut TaskContext, remote: &dyn Remote) -> Result<TaskResult> {
        let mut result = TaskResult::new(self.task_type());
        result.mark_started();
        info!("Building exchange grids");

        let mut shell = ShellSession::new();
        let mut source = shell.with_prefix(context.render("source {envconf}")?);
        let gengrid = source.with_cwd(context.render("{workdir}/gengrid")?);

        let make = gengrid
            .command(context.render(
                "{executable_make_xgrids} -o ocean_grid.nc -a {atmos_gridx},{atmos_gridy}",
            )?)
            .allow_any_exit();
        let output = remote.run_checked(&make).await?;
        if output.exit_code != XGRIDS_SUCCESS {
            return Err(ExecutionError::UnexpectedExit {
                command: make.command_line(),
                exit_code: output.exit_code,
            });
        }

        remote
            .run_checked(&gengrid.command("cp ocean_grid.nc grid_spec_UNION.nc"))
            .await?;

        let mut merged = Vec::new();
        if merge_tiles(context, remote, &gengrid, "ocean_grid").await? {
            merged.push("ocean_grid");
        }
        remote
            .run_checked(&gengrid.command("ncks -A grid_spec.nc grid_spec_UNION.nc"))
            .await?;
        if merge_tiles(context, remote, &gengrid, "grid_spec").await? {
            merged.push("grid_spec");
        }

        result.add_metadata("merged_tiles", merged.join(","));
        Ok(result.succeed(Some("grid_spec_UNION.nc".to_string())))
    }

    fn task_type(&self) -> &'static str {
        "make_xgrids"
    }

    fn description(&self) -> &'static str {
        "Build exchange grids and merge them into grid_spec_UNION.nc"
    }
}

// ABOUTME: Namelist preparation tasks for the ocean model and the 2D regridding tool
// ABOUTME: Fetch a template namelist, overlay configured values, derive run parameters, push input.nml

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::TaskImplementation;
use crate::engine::error::Result;
use crate::engine::{NamelistPipeline, TaskContext, TaskResult};
use crate::environ::EnvStore;
use crate::namelist::{
    apply_in_place, overlay_from_value, Document, NamelistError, NmlValue, OverlayMode,
    OverlaySpec,
};
use crate::params::{self, RunMode};
use crate::remote::{CommandSpec, Remote};

const COUPLER: &str = "coupler_nml";
const OCEAN_MODEL: &str = "ocean_model_nml";
const DRIFTERS: &str = "ocean_drifters_nml";
const REGRID_2D: &str = "regrid_2d_nml";

pub struct PrepareNamelistTask;

#[async_trait]
impl TaskImplementation for PrepareNamelistTask {
    async fn execute(&self, context: &mut TaskContext, remote: &dyn Remote) -> Result<TaskResult> {
        let mut result = TaskResult::new(self.task_type());
        result.mark_started();
        info!("Preparing ocean namelist");

        let source = context.render("{ocean_namelist.file}")?;
        let target = context.render("{workdir}/input.nml")?;
        let overlay = overlay_at(&context.store, "ocean_namelist.vars")?;
        let mode = context.overlay_mode;

        let mut pipeline = NamelistPipeline::new(&source, &target);
        pipeline.fetch(remote).await?;
        pipeline.decode()?;

        let store = &context.store;
        let mut drifters = false;
        pipeline.transform(|doc| {
            drifters = prepare_ocean_namelist(doc, store, &overlay, mode)?;
            Ok(())
        })?;
        if drifters {
            context.set("run_drifters_pos", true);
        }

        pipeline.encode()?;
        pipeline.dispatch(remote).await?;

        result.add_metadata("source", source);
        result.add_metadata("target", target.clone());
        Ok(result.succeed(Some(format!("Wrote {}", target))))
    }

    fn task_type(&self) -> &'static str {
        "prepare_namelist"
    }

    fn description(&self) -> &'static str {
        "Build the ocean model input.nml from the template namelist"
    }
}

pub struct Regrid2dPrepareTask;

#[async_trait]
impl TaskImplementation for Regrid2dPrepareTask {
    async fn execute(&self, context: &mut TaskContext, remote: &dyn Remote) -> Result<TaskResult> {
        let mut result = TaskResult::new(self.task_type());
        result.mark_started();

        let target = prepare_regrid_2d(context, remote).await?;
        result.add_metadata("target", target.clone());
        Ok(result.succeed(Some(format!("Wrote {}", target))))
    }

    fn task_type(&self) -> &'static str {
        "regrid_2d_prepare"
    }

    fn description(&self) -> &'static str {
        "Stage the 2D regridding source file and write its input.nml"
    }
}

/// Stage the regrid source next to the tool and write its namelist.
///
/// The namelist's `src_file` is copied to `{regrid_2d_workdir}/src_file.nc`
/// and the namelist is pointed at the copy. Returns the namelist path.
pub async fn prepare_regrid_2d(context: &mut TaskContext, remote: &dyn Remote) -> Result<String> {
    info!("Preparing 2D regrid namelist");

    let source = context.render("{regrid_2d_namelist.file}")?;
    let workdir = context.render("{regrid_2d_workdir}")?;
    let target = format!("{}/input.nml", workdir);
    let overlay = overlay_at(&context.store, "regrid_2d_namelist.vars")?;
    let mode = context.overlay_mode;

    let mut pipeline = NamelistPipeline::new(&source, &target);
    pipeline.fetch(remote).await?;
    pipeline.decode()?;

    let mut src_file = String::new();
    pipeline.transform(|doc| {
        apply_in_place(doc, &overlay, mode)?;
        src_file = match doc.get(REGRID_2D, "src_file").and_then(NmlValue::as_str) {
            Some(path) => path.to_string(),
            None => {
                return Err(NamelistError::UnsupportedValue {
                    key: format!("{}.src_file", REGRID_2D),
                    reason: "missing or not a string".to_string(),
                }
                .into())
            }
        };
        doc.set(REGRID_2D, "src_file", "src_file.nc")?;
        Ok(())
    })?;

    let copy = CommandSpec::new("cp")
        .arg(&src_file)
        .arg(format!("{}/src_file.nc", workdir));
    remote.run_checked(&copy).await?;

    pipeline.encode()?;
    pipeline.dispatch(remote).await?;
    Ok(target)
}

/// Overlay the configured values, then set layout, time steps, run length and
/// start date. Returns whether the drifters module is enabled.
pub fn prepare_ocean_namelist(
    doc: &mut Document,
    store: &EnvStore,
    overlay: &OverlaySpec,
    mode: OverlayMode,
) -> Result<bool> {
    apply_in_place(doc, overlay, mode)?;

    let concurrent = doc
        .get(COUPLER, "concurrent")
        .and_then(NmlValue::as_bool)
        .unwrap_or(false);
    let npes = if concurrent {
        doc.get(COUPLER, "ocean_npes")
            .and_then(NmlValue::as_i64)
            .ok_or_else(|| NamelistError::UnsupportedValue {
                key: format!("{}.ocean_npes", COUPLER),
                reason: "concurrent runs need an integer ocean_npes".to_string(),
            })?
    } else {
        store.get_i64("npes")?
    };
    doc.set(OCEAN_MODEL, "layout", params::layout(npes)?.to_nml())?;

    for (group, key) in [
        (OCEAN_MODEL, "dt_ocean"),
        (COUPLER, "dt_atmos"),
        (COUPLER, "dt_cpld"),
    ] {
        doc.set(group, key, store_value(store, key)?)?;
    }

    let length = params::run_length(optional_i64(store, "days")?, optional_i64(store, "months")?)?;
    length.apply(doc, COUPLER)?;

    let run_mode: RunMode = store.get_string("mode")?.parse()?;
    let start = optional_string(store, "start")?;
    let restart = optional_string(store, "restart")?;
    let date = params::start_date(run_mode, start.as_deref(), restart.as_deref())?;
    doc.set(COUPLER, "current_date", date.to_nml())?;

    Ok(doc.get(DRIFTERS, "use_this_module").and_then(NmlValue::as_bool) == Some(true))
}

fn overlay_at(store: &EnvStore, path: &str) -> Result<OverlaySpec> {
    Ok(overlay_from_value(store.find(path).unwrap_or(&Value::Null))?)
}

fn store_value(store: &EnvStore, key: &str) -> Result<NmlValue> {
    let value = store.lookup(key)?;
    Ok(NmlValue::try_from(value).map_err(|reason| NamelistError::UnsupportedValue {
        key: key.to_string(),
        reason,
    })?)
}

fn optional_i64(store: &EnvStore, key: &str) -> Result<Option<i64>> {
    match store.find(key) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => Ok(Some(store.get_i64(key)?)),
    }
}

fn optional_string(store: &EnvStore, key: &str) -> Result<Option<String>> {
    match store.find(key) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => Ok(Some(store.get_string(key)?)),
    }
}

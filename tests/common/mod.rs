// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Provides a sample experiment environment, template namelists, and mock remote setup

#![allow(dead_code)]

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use bosun::environ::{deep_merge, EnvStore};
use bosun::remote::MockRemote;
use bosun::TaskContext;

pub const OCEAN_TEMPLATE_PATH: &str = "/exp/templates/input.nml";
pub const REGRID_TEMPLATE_PATH: &str = "/exp/templates/regrid_2d.nml";

/// Ocean model namelist as shipped with an experiment
pub const OCEAN_TEMPLATE: &str = r#"! MOM4 experiment namelist
&coupler_nml
    months = 1
    days = 0
    current_date = 1900, 1, 1, 0, 0, 0
    calendar = 'julian'
    dt_cpld = 7200
    dt_atmos = 7200
    concurrent = .false.
    ocean_npes = 0
/

&ocean_model_nml
    layout = 1, 1
    dt_ocean = 7200
    time_tendency = 'twolevel'
/

&ocean_drifters_nml
    use_this_module = .false.
/
"#;

pub const REGRID_TEMPLATE: &str = r#"&regrid_2d_nml
    src_file = '/data/levitus_sst.nc'
    dest_grid = 'grid_spec.nc'
    num_flds = 1
    vector_fld = .false.
/
"#;

pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.file(name);
        std::fs::write(&path, contents).expect("Failed to write test file");
        path
    }
}

/// Environment values for a complete experiment
pub fn experiment_values() -> Value {
    json!({
        "name": "cfsr_exp",
        "expdir": "/exp",
        "envconf": "/exp/env.conf",
        "workdir": "/exp/work",
        "execdir": "/exp/exec",
        "root": "/opt/mom4",
        "platform": "cray",
        "walltime": "02:00:00",
        "account": "ocean",
        "datatable": "/exp/data_table",
        "diagtable": "/exp/diag_table",
        "fieldtable": "/exp/field_table",
        "executable": "/exp/exec/mom4.x",
        "mppnccombine": "/exp/exec/mppnccombine",
        "comb_exe": "/exp/exec/comb",
        "npes": 120,
        "dt_ocean": 3600,
        "dt_atmos": 3600,
        "dt_cpld": 3600,
        "days": 5,
        "mode": "cold",
        "start": "2001010100",
        "restart": "2001010600",
        "finish": "2001011100",
        "regrid_2d_workdir": "/exp/work/regrid_2d",
        "ocean_namelist": {
            "file": OCEAN_TEMPLATE_PATH,
            "vars": {
                "ocean_model_nml": {"time_tendency": "threelevel"}
            }
        },
        "regrid_2d_namelist": {
            "file": REGRID_TEMPLATE_PATH,
            "vars": {
                "regrid_2d_nml": {"num_flds": 2}
            }
        }
    })
}

pub fn experiment_store(extra: Value) -> EnvStore {
    let mut values = experiment_values();
    deep_merge(&mut values, extra);
    EnvStore::from_value(values).expect("experiment values form a mapping")
}

pub fn experiment_context(extra: Value) -> TaskContext {
    TaskContext::new(experiment_store(extra))
}

/// Mock host holding both template namelists
pub async fn mock_remote() -> MockRemote {
    let remote = MockRemote::new();
    remote.add_file(OCEAN_TEMPLATE_PATH, OCEAN_TEMPLATE).await;
    remote.add_file(REGRID_TEMPLATE_PATH, REGRID_TEMPLATE).await;
    remote
}

#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use hospital_import::{
    data::{RawTable, Table},
    io_utils, normalize, source,
};
use tempfile::{TempDir, tempdir};

pub const SAMPLE_FIXTURE: &str = "healthcare_sample.csv";

pub const HEADER: &str = "Name,Age,Gender,Blood Type,Medical Condition,Date of Admission,Doctor,Hospital,Insurance Provider,Billing Amount,Room Number,Admission Type,Discharge Date,Medication,Test Results";

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Reads a fixture into its raw form.
pub fn load_fixture(name: &str) -> RawTable {
    source::load_raw_table(
        &fixture_path(name),
        b',',
        io_utils::resolve_encoding(None).expect("utf-8"),
    )
    .expect("load fixture")
}

pub fn normalized_fixture(name: &str) -> Table {
    normalize::normalize_table(&load_fixture(name))
}

/// A well-formed data line for patient `name`, varying only the room.
pub fn patient_line(name: &str, room: usize) -> String {
    format!(
        "{name},50,Female,O+,Asthma,2023-05-01,Jane Doe,City Clinic,Aetna,1200.5,{room},Elective,2023-05-04,Aspirin,Normal"
    )
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes a dataset made of the standard header and `lines`.
    pub fn write_dataset(&self, name: &str, lines: &[String]) -> PathBuf {
        let mut contents = String::from(HEADER);
        contents.push('\n');
        for line in lines {
            contents.push_str(line);
            contents.push('\n');
        }
        self.write(name, &contents)
    }
}

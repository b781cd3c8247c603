//! CSV output. Each report is a `Serialize` row type registered once with a file path; rows
//! are appended with `send_report` and flushed immediately so partial runs leave usable output.
use std::any::TypeId;
use std::cell::RefCell;
use std::ffi::OsStr;
use std::fs::{create_dir_all, File};
use std::path::{Path, PathBuf};

use csv::Writer;
use serde::Serialize;

use crate::context::Context;
use crate::error::ContagionError;
use crate::hashing::HashMap;

pub trait Report: Serialize + 'static {}

/// Use this macro to mark a row type as a report.
#[macro_export]
macro_rules! create_report_trait {
    ($name:ident) => {
        impl $crate::report::Report for $name {}
    };
}
pub use create_report_trait;

struct ReportData {
    file_writers: RefCell<HashMap<TypeId, Writer<File>>>,
    output_dir: Option<PathBuf>,
}

// Registers a data container that stores
// * file_writers: Maps report type to file writer
// * output_dir: Where the model's standard reports go, if anywhere
crate::context::define_data_plugin!(
    ReportPlugin,
    ReportData,
    ReportData {
        file_writers: RefCell::new(HashMap::default()),
        output_dir: None,
    }
);

// Checks that the path is valid. Creates the file and all parent directories if
// they do not exist. Returns the file if successful. Called by `add_report`
fn generate_validate_filepath(path: &Path) -> Result<File, ContagionError> {
    match path.extension().and_then(OsStr::to_str) {
        Some("csv") => {
            if let Some(parent) = path.parent() {
                create_dir_all(parent)?;
            }
            let file = File::create(path)?;
            Ok(file)
        }
        _ => Err(ContagionError::ReportError(
            "Report output files must be CSVs".to_string(),
        )),
    }
}

pub trait ContextReportExt {
    /// Call `add_report` with each report type, passing the path of the output file.
    ///
    /// # Errors
    /// Returns a `ContagionError` if the path is not a `.csv` file or cannot be created.
    fn add_report<T: Report>(&mut self, path: &Path) -> Result<(), ContagionError>;

    /// Write a new row with columns following items in the report struct
    /// to the report file associated with the report type struct.
    ///
    /// # Errors
    /// Returns a `ContagionError` if no file was registered for `T` or writing fails.
    fn send_report<T: Report>(&self, report: T) -> Result<(), ContagionError>;

    /// Sets the directory the model writes its standard reports to.
    fn set_output_dir(&mut self, path: PathBuf);

    /// The directory set by `set_output_dir`; `None` means no reports are written.
    fn get_output_dir(&self) -> Option<PathBuf>;
}

impl ContextReportExt for Context {
    fn add_report<T: Report>(&mut self, path: &Path) -> Result<(), ContagionError> {
        let file = generate_validate_filepath(path)?;
        let data_container = self.get_data_container_mut(ReportPlugin);
        data_container
            .file_writers
            .borrow_mut()
            .insert(TypeId::of::<T>(), Writer::from_writer(file));
        Ok(())
    }

    fn send_report<T: Report>(&self, report: T) -> Result<(), ContagionError> {
        let missing = || ContagionError::ReportError("No writer found for the report type".into());
        // No data container will exist if no reports have been added
        let data_container = self.get_data_container(ReportPlugin).ok_or_else(missing)?;
        let mut writers = data_container.file_writers.borrow_mut();
        let writer = writers.get_mut(&TypeId::of::<T>()).ok_or_else(missing)?;
        writer.serialize(report)?;
        writer.flush()?;
        Ok(())
    }

    fn set_output_dir(&mut self, path: PathBuf) {
        self.get_data_container_mut(ReportPlugin).output_dir = Some(path);
    }

    fn get_output_dir(&self) -> Option<PathBuf> {
        self.get_data_container(ReportPlugin)
            .and_then(|data| data.output_dir.clone())
    }
}

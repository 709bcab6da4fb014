//! Subprocess-backed bundle reader.
//!
//! The production [`BundleReader`] shells out to an external ripper
//! executable that links the actual bundle-format library. Protocol:
//!
//! - `<ripper> dump <bundle>` — write the bundle's object listing as JSON
//!   (the [`BundleDump`] shape) to stdout.
//! - `<ripper> export-image <bundle> <path_id> <out>` — decode one image
//!   object and save it to `<out>`.

use std::path::{Path, PathBuf};
use std::process::Command;

use super::bundle::{BundleDump, BundleReader};
use super::error::ExtractError;

/// Executable name looked up on PATH when none is configured.
const DEFAULT_PROGRAM: &str = "bundle-ripper";

/// A discovered ripper executable.
#[derive(Debug, Clone)]
pub struct RipperCommand {
    program: PathBuf,
}

impl RipperCommand {
    /// Resolve the ripper executable, preferring an explicitly configured
    /// name over the PATH default.
    pub fn discover(explicit: Option<&str>) -> Result<Self, ExtractError> {
        let name = explicit.unwrap_or(DEFAULT_PROGRAM);
        let program = which::which(name).map_err(ExtractError::RipperNotFound)?;
        tracing::debug!(ripper = %program.display(), "Using bundle ripper");
        Ok(Self { program })
    }

    fn run(&self, args: &[&std::ffi::OsStr]) -> Result<Vec<u8>, ExtractError> {
        let output = Command::new(&self.program).args(args).output()?;
        if !output.status.success() {
            return Err(ExtractError::RipperFailed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(output.stdout)
    }
}

impl BundleReader for RipperCommand {
    fn read(&self, bundle: &Path) -> Result<BundleDump, ExtractError> {
        let stdout = self.run(&["dump".as_ref(), bundle.as_os_str()])?;
        Ok(serde_json::from_slice(&stdout)?)
    }

    fn export_image(
        &self,
        bundle: &Path,
        path_id: i64,
        out: &Path,
    ) -> Result<(), ExtractError> {
        let id = path_id.to_string();
        self.run(&[
            "export-image".as_ref(),
            bundle.as_os_str(),
            id.as_ref(),
            out.as_os_str(),
        ])?;
        Ok(())
    }
}

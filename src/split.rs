//! Reducing a measurement set to a single field and spectral window with
//! CASA's `split` task.

use std::{
    io,
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
};

use log::{debug, info};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SplitError {
    #[error("Couldn't run '{casa}': {err}")]
    Spawn { casa: PathBuf, err: io::Error },

    #[error("Splitting {vis} into {outputvis} failed ({status})")]
    Failed {
        vis: PathBuf,
        outputvis: PathBuf,
        status: ExitStatus,
    },

    #[error("The split appeared to succeed, but {0} wasn't created")]
    NoOutput(PathBuf),

    #[error("Path {0} isn't valid UTF-8; it can't be given to CASA")]
    NonUtf8Path(PathBuf),
}

/// The arguments of a single `split` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitRequest {
    pub vis: PathBuf,
    pub outputvis: PathBuf,
    pub field: String,
    /// An empty string selects every spectral window.
    pub spw: String,
    /// The number of channels to average together. `None` leaves the
    /// channels alone.
    pub width: Option<usize>,
    pub datacolumn: String,
    pub keepflags: bool,
    pub keepmms: bool,
}

impl SplitRequest {
    /// A request with the settings used for every split here: the `data`
    /// column is kept, flagged rows are dropped, and multi-MSs stay
    /// multi-MSs.
    pub fn new(
        vis: PathBuf,
        outputvis: PathBuf,
        field: &str,
        spw: &str,
        width: Option<usize>,
    ) -> SplitRequest {
        SplitRequest {
            vis,
            outputvis,
            field: field.to_string(),
            spw: spw.to_string(),
            width,
            datacolumn: "data".to_string(),
            keepflags: false,
            keepmms: true,
        }
    }

    /// The Python statement that CASA needs to run for this request.
    pub fn casa_script(&self) -> Result<String, SplitError> {
        let vis = path_str(&self.vis)?;
        let outputvis = path_str(&self.outputvis)?;
        let mut args = vec![
            format!("vis={}", py_str(vis)),
            format!("outputvis={}", py_str(outputvis)),
            format!("keepmms={}", py_bool(self.keepmms)),
            format!("field={}", py_str(&self.field)),
            format!("spw={}", py_str(&self.spw)),
            format!("datacolumn={}", py_str(&self.datacolumn)),
        ];
        if let Some(width) = self.width {
            args.push(format!("width={width}"));
        }
        args.push(format!("keepflags={}", py_bool(self.keepflags)));
        Ok(format!("split({})", args.join(", ")))
    }
}

fn path_str(p: &Path) -> Result<&str, SplitError> {
    p.to_str()
        .ok_or_else(|| SplitError::NonUtf8Path(p.to_path_buf()))
}

/// Quote a string as a Python literal.
fn py_str(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn py_bool(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

/// Something that can produce a smaller measurement set from a bigger one.
pub trait Split {
    /// Perform the split. On success, `request.outputvis` exists.
    fn split(&self, request: &SplitRequest) -> Result<(), SplitError>;
}

/// Run `split` with a CASA installation.
#[derive(Debug, Clone)]
pub struct CasaSplit {
    /// The `casa` executable.
    pub casa: PathBuf,
}

impl CasaSplit {
    pub fn new<P: Into<PathBuf>>(casa: P) -> CasaSplit {
        CasaSplit { casa: casa.into() }
    }
}

impl Default for CasaSplit {
    fn default() -> Self {
        CasaSplit::new("casa")
    }
}

impl Split for CasaSplit {
    fn split(&self, request: &SplitRequest) -> Result<(), SplitError> {
        let script = request.casa_script()?;
        info!(
            "Splitting {} into {}",
            request.vis.display(),
            request.outputvis.display()
        );
        debug!("{} -c \"{script}\"", self.casa.display());

        let status = Command::new(&self.casa)
            .args(["--nologger", "--nogui", "-c", &script])
            .status()
            .map_err(|err| SplitError::Spawn {
                casa: self.casa.clone(),
                err,
            })?;
        if !status.success() {
            return Err(SplitError::Failed {
                vis: request.vis.clone(),
                outputvis: request.outputvis.clone(),
                status,
            });
        }
        if !request.outputvis.exists() {
            return Err(SplitError::NoOutput(request.outputvis.clone()));
        }
        Ok(())
    }
}

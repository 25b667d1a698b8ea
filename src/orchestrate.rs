//! Splitting datasets down to one spectral window, then exporting products
//! from them.

use std::{
    fmt::Display,
    path::{Path, PathBuf},
    str::FromStr,
};

use indicatif::ProgressBar;
use itertools::Itertools;
use log::{debug, error, info, warn};
use thiserror::Error;
use vec1::{vec1, Vec1};

use crate::{
    convert::ConversionPath,
    read::{get_antennas, get_frequencies, get_scans, get_sigma, get_times, get_visibilities},
    split::{Split, SplitError, SplitRequest},
    wavelengths::get_uv_wavelengths,
    write::{existing_export, export, ExportConfig, ExportError, ExportOutcome},
};

#[derive(Error, Debug)]
pub enum OrchestrateError {
    #[error("{0} doesn't exist, and there's nothing to split it from")]
    MissingDataset(PathBuf),

    #[error("{0} doesn't exist and splitting is disabled")]
    SplitDisabled(PathBuf),

    #[error("Couldn't make {outputvis}: {err}")]
    Split { outputvis: PathBuf, err: SplitError },

    #[error("spw {spw}, {product}: {err}")]
    Export {
        spw: String,
        product: Product,
        err: ExportError,
    },

    #[error("No spectral windows were given")]
    NoSpectralWindows,

    #[error("{num_failed} of {num_attempted} exports failed")]
    Incomplete {
        num_failed: usize,
        num_attempted: usize,
    },

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

/// Something that can be exported from a split measurement set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Product {
    UvWavelengths,
    Visibilities,
    Antennas,
    Scans,
    Frequencies,
    Times,
    Sigma,
}

impl Product {
    pub const ALL: [Product; 7] = [
        Product::UvWavelengths,
        Product::Visibilities,
        Product::Antennas,
        Product::Scans,
        Product::Frequencies,
        Product::Times,
        Product::Sigma,
    ];

    /// What's exported when nothing else is asked for.
    pub fn defaults() -> Vec1<Product> {
        vec1![
            Product::UvWavelengths,
            Product::Visibilities,
            Product::Antennas,
            Product::Scans,
            Product::Frequencies,
        ]
    }

    /// The name used at the start of output filenames.
    pub fn name(self) -> &'static str {
        match self {
            Product::UvWavelengths => "uv_wavelengths",
            Product::Visibilities => "visibilities",
            Product::Antennas => "antennas",
            Product::Scans => "scans",
            Product::Frequencies => "frequencies",
            Product::Times => "times",
            Product::Sigma => "sigma",
        }
    }
}

impl Display for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown product '{0}'; expected one of: {}", Product::ALL.iter().join(", "))]
pub struct UnknownProduct(pub String);

impl FromStr for Product {
    type Err = UnknownProduct;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Product::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownProduct(s.to_string()))
    }
}

/// The naming conventions of the datasets and products of one observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetNames {
    /// e.g. "A002_X11adad7_Xdfdb"
    pub uid: String,
    /// e.g. "SPT0314-44"
    pub field: String,
    /// The channel-averaging width.
    pub width: usize,
    /// Are we working with continuum-subtracted data?
    pub contsub: bool,
}

impl DatasetNames {
    /// The calibrated measurement set of the whole observation.
    pub fn base_ms(&self) -> String {
        let ms = format!("uid___{}.ms.split.cal", self.uid);
        if self.contsub {
            format!("{ms}.contsub")
        } else {
            ms
        }
    }

    /// The observation with only `field` in it.
    pub fn field_ms(&self) -> String {
        format!("uid___{}_{}.ms.split.cal", self.uid, self.field)
    }

    /// The dataset that products are exported from.
    ///
    /// Continuum-subtracted datasets only contain a single spectral window,
    /// so `spw` doesn't feature in their names.
    pub fn spw_ms(&self, spw: &str) -> String {
        if self.contsub {
            format!(
                "uid___{}_width_{}.ms.split.cal.contsub",
                self.uid, self.width
            )
        } else {
            format!(
                "uid___{}_{}_spw_{}_width_{}.ms.split.cal",
                self.uid, self.field, spw, self.width
            )
        }
    }

    /// The output filename (without an extension) of a product.
    pub fn product_stem(&self, product: Product, spw: &str) -> String {
        let stem = format!(
            "{}_{}_{}_spw_{}_width_{}",
            product.name(),
            self.uid,
            self.field,
            spw,
            self.width
        );
        if self.contsub {
            format!("{stem}_contsub")
        } else {
            stem
        }
    }
}

/// The spectral windows to work on, in order, without repeats.
pub fn unique_spws(spws: Vec<String>) -> Result<Vec1<String>, OrchestrateError> {
    Vec1::try_from_vec(spws.into_iter().unique().collect())
        .map_err(|_| OrchestrateError::NoSpectralWindows)
}

/// The products to export, in order, without repeats. Nothing (or an empty
/// list) means [`Product::defaults`].
pub fn unique_products(products: Option<Vec<Product>>) -> Vec1<Product> {
    products
        .and_then(|p| Vec1::try_from_vec(p.into_iter().unique().collect()).ok())
        .unwrap_or_else(Product::defaults)
}

/// Everything to do in a run.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub names: DatasetNames,
    /// The spectral windows to export.
    pub spws: Vec1<String>,
    pub products: Vec1<Product>,
    /// Where the measurement sets live (and where split ones get written).
    pub data_dir: PathBuf,
    /// Where the products get written.
    pub output_dir: PathBuf,
    pub conversion: ConversionPath,
    /// Whether missing datasets may be made with the split tool.
    pub allow_split: bool,
    /// Carry on after a failed export, rather than stopping.
    pub keep_going: bool,
}

/// What a successful run did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub num_splits: usize,
}

/// Export a single product from the measurement set `ms`.
pub fn export_product(
    config: &ExportConfig,
    product: Product,
    ms: &Path,
    conversion: ConversionPath,
    stem: &Path,
) -> Result<ExportOutcome, ExportError> {
    match product {
        Product::UvWavelengths => export(config, || get_uv_wavelengths(ms, conversion), stem),
        Product::Visibilities => export(config, || get_visibilities(ms), stem),
        Product::Antennas => export(config, || get_antennas(ms), stem),
        Product::Scans => export(config, || get_scans(ms), stem),
        Product::Frequencies => export(config, || get_frequencies(ms), stem),
        Product::Times => export(config, || get_times(ms), stem),
        Product::Sigma => export(config, || get_sigma(ms), stem),
    }
}

impl RunPlan {
    fn data_path(&self, name: String) -> PathBuf {
        self.data_dir.join(name)
    }

    fn stem(&self, product: Product, spw: &str) -> PathBuf {
        self.output_dir.join(self.names.product_stem(product, spw))
    }

    fn split(
        &self,
        splitter: &dyn Split,
        request: SplitRequest,
        summary: &mut RunSummary,
    ) -> Result<(), OrchestrateError> {
        if !self.allow_split {
            return Err(OrchestrateError::SplitDisabled(request.outputvis));
        }
        if !request.vis.is_dir() {
            return Err(OrchestrateError::MissingDataset(request.vis));
        }
        splitter
            .split(&request)
            .map_err(|err| OrchestrateError::Split {
                outputvis: request.outputvis.clone(),
                err,
            })?;
        summary.num_splits += 1;
        Ok(())
    }

    /// Make sure the dataset for `spw` exists, splitting it out of bigger
    /// datasets if need be.
    fn prepare_spw_ms(
        &self,
        splitter: &dyn Split,
        spw: &str,
        summary: &mut RunSummary,
    ) -> Result<PathBuf, OrchestrateError> {
        let spw_ms = self.data_path(self.names.spw_ms(spw));
        if spw_ms.is_dir() {
            debug!("{} exists", spw_ms.display());
            return Ok(spw_ms);
        }

        let width = Some(self.names.width);
        let request = if self.names.contsub {
            // The continuum-subtracted dataset has a single spectral window.
            SplitRequest::new(
                self.data_path(self.names.base_ms()),
                spw_ms.clone(),
                &self.names.field,
                "0",
                width,
            )
        } else {
            let field_ms = self.data_path(self.names.field_ms());
            if !field_ms.is_dir() {
                let request = SplitRequest::new(
                    self.data_path(self.names.base_ms()),
                    field_ms.clone(),
                    &self.names.field,
                    "",
                    None,
                );
                self.split(splitter, request, summary)?;
            }
            SplitRequest::new(field_ms, spw_ms.clone(), &self.names.field, spw, width)
        };
        self.split(splitter, request, summary)?;
        Ok(spw_ms)
    }

    /// With `keep_going`, log `e` and count `num_exports` failures; otherwise
    /// hand `e` back.
    fn tolerate(
        &self,
        e: OrchestrateError,
        num_exports: usize,
        num_failed: &mut usize,
    ) -> Result<(), OrchestrateError> {
        if self.keep_going {
            error!("{e}");
            *num_failed += num_exports;
            Ok(())
        } else {
            Err(e)
        }
    }

    /// Run the plan. With `keep_going`, every product is attempted and
    /// [`OrchestrateError::Incomplete`] is returned at the end if any failed.
    pub fn run(
        &self,
        config: &ExportConfig,
        splitter: &dyn Split,
        progress: Option<ProgressBar>,
    ) -> Result<RunSummary, OrchestrateError> {
        std::fs::create_dir_all(&self.output_dir)?;
        info!(
            "Exporting {} with the {} backend",
            self.products.iter().join(", "),
            config.backend
        );

        let num_products = self.products.len();
        let mut summary = RunSummary::default();
        let mut num_failed = 0;
        let mut num_attempted = 0;

        for spw in self.spws.iter() {
            info!("spw {spw}");
            // Don't bother with the dataset if everything is already there.
            let existing: Vec<PathBuf> = self
                .products
                .iter()
                .filter_map(|&p| existing_export(&self.stem(p, spw)))
                .collect();
            if existing.len() == num_products {
                info!("All products for spw {spw} already exist");
                summary.skipped.extend(existing);
                if let Some(progress) = progress.as_ref() {
                    progress.inc(num_products as u64);
                }
                continue;
            }

            let spw_ms = match self.prepare_spw_ms(splitter, spw, &mut summary) {
                Ok(ms) => ms,
                Err(e) => {
                    num_attempted += num_products;
                    self.tolerate(e, num_products, &mut num_failed)?;
                    if let Some(progress) = progress.as_ref() {
                        progress.inc(num_products as u64);
                    }
                    continue;
                }
            };

            for &product in self.products.iter() {
                num_attempted += 1;
                let stem = self.stem(product, spw);
                match export_product(config, product, &spw_ms, self.conversion, &stem) {
                    Ok(ExportOutcome::Written(p)) => summary.written.push(p),
                    Ok(ExportOutcome::Skipped(p)) => summary.skipped.push(p),
                    Err(err) => {
                        let e = OrchestrateError::Export {
                            spw: spw.clone(),
                            product,
                            err,
                        };
                        self.tolerate(e, 1, &mut num_failed)?;
                    }
                }
                if let Some(progress) = progress.as_ref() {
                    progress.inc(1);
                }
            }
        }
        if let Some(progress) = progress {
            progress.finish();
        }

        if num_failed > 0 {
            warn!("{num_failed} of {num_attempted} exports failed");
            return Err(OrchestrateError::Incomplete {
                num_failed,
                num_attempted,
            });
        }
        info!(
            "{} products written, {} skipped",
            summary.written.len(),
            summary.skipped.len()
        );
        Ok(summary)
    }
}

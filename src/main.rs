use std::path::PathBuf;

use clap::{AppSettings, Parser};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use itertools::Itertools;
use log::{error, info};

use ms_vis_export::{
    convert::ConversionPath,
    orchestrate::{unique_products, unique_spws, DatasetNames, OrchestrateError, Product, RunPlan},
    split::CasaSplit,
    write::ExportConfig,
};

#[derive(Parser)]
#[clap(version, about)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(disable_help_subcommand = true)]
#[clap(infer_long_args = true)]
struct Args {
    /// The ID of the observation, e.g. A002_X11adad7_Xdfdb. Its calibrated
    /// data should be in uid___<UID>.ms.split.cal.
    uid: String,

    /// The field to export, e.g. SPT0314-44.
    #[clap(short, long)]
    field: String,

    /// The spectral windows to export.
    #[clap(short, long, multiple_values(true), required = true)]
    spws: Vec<String>,

    /// The number of channels to average together when splitting.
    #[clap(short, long)]
    width: usize,

    /// What to export. The default is uv_wavelengths, visibilities, antennas,
    /// scans and frequencies. times and sigma are also available.
    #[clap(short, long, multiple_values(true))]
    products: Option<Vec<Product>>,

    /// The directory containing the measurement sets. Split measurement sets
    /// are also written here.
    #[clap(long, default_value = ".")]
    data_dir: PathBuf,

    /// The directory to write products into.
    #[clap(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Work with the continuum-subtracted data (uid___<UID>.ms.split.cal.contsub).
    #[clap(long)]
    contsub: bool,

    /// Write NumPy files, even if FITS is available.
    #[clap(long)]
    npy: bool,

    /// Convert to wavelengths with plain arithmetic, rather than with unit
    /// types. The results agree to well within 1e-9.
    #[clap(long)]
    plain_conversion: bool,

    /// The CASA executable used to split measurement sets.
    #[clap(long, default_value = "casa")]
    casa: PathBuf,

    /// Don't split anything; fail if a measurement set is missing.
    #[clap(long)]
    no_split: bool,

    /// Carry on with other exports after one fails.
    #[clap(long)]
    keep_going: bool,

    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    verbosity: u8,

    /// Disable progress bars.
    #[clap(long)]
    no_progress_bars: bool,
}

fn main() {
    let args = Args::parse();
    setup_logging(args.verbosity);

    if let Err(e) = try_main(args) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn try_main(args: Args) -> Result<(), OrchestrateError> {
    let config = ExportConfig::new(args.npy);
    info!("Output format: {}", config.backend);

    let spws = unique_spws(args.spws)?;
    let products = unique_products(args.products);

    let plan = RunPlan {
        names: DatasetNames {
            uid: args.uid,
            field: args.field,
            width: args.width,
            contsub: args.contsub,
        },
        spws,
        products,
        data_dir: args.data_dir,
        output_dir: args.output_dir,
        conversion: if args.plain_conversion {
            ConversionPath::Plain
        } else {
            ConversionPath::Units
        },
        allow_split: !args.no_split,
        keep_going: args.keep_going,
    };
    info!("Observation: {}, field {}", plan.names.uid, plan.names.field);
    info!("Spectral windows: {}", plan.spws.iter().join(", "));

    let num_exports = plan.spws.len() * plan.products.len();
    let progress = ProgressBar::with_draw_target(
        Some(num_exports as u64),
        if args.no_progress_bars {
            ProgressDrawTarget::hidden()
        } else {
            ProgressDrawTarget::stdout()
        },
    )
    .with_style(
        ProgressStyle::default_bar()
            .template(
                "{msg:17}: [{wide_bar:.blue}] {pos:2}/{len:2} products ({elapsed_precise}<{eta_precise})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    )
    .with_position(0)
    .with_message("Exporting");
    progress.tick();

    let splitter = CasaSplit::new(args.casa);
    plan.run(&config, &splitter, Some(progress))?;
    Ok(())
}

fn setup_logging(verbosity: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stdout);
    builder.format_target(false);
    match verbosity {
        0 => builder.filter_level(log::LevelFilter::Info),
        1 => builder.filter_level(log::LevelFilter::Debug),
        2 => builder.filter_level(log::LevelFilter::Trace),
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
            builder.format(|buf, record| {
                use std::io::Write;

                let timestamp = buf.timestamp();
                let level = record.level();
                let target = record.target();
                let line = record.line().unwrap_or(0);
                let message = record.args();

                writeln!(buf, "[{timestamp} {level} {target}:{line}] {message}")
            })
        }
    };
    builder.init();
}

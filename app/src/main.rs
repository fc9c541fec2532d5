mod error;
mod pipeline;
mod report;

use std::{fs::File, io::BufReader, io::Write as _, path::PathBuf, process::ExitCode};

use chrono::Local;
use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;
use pcd_core::Encoding;
use pcd_forest::ForestParams;

use error::AppError;
use pipeline::{run, RunOptions};

#[derive(Parser, Debug)]
#[command(
    name = "forestutils",
    about = "Takes a .ply forest point cloud; writes a sparse point cloud and a .csv file of attributes for each tree",
    version = "0.0.1"
)]
struct Cli {
    /// Point cloud to analyse (.ply, first part of a multi-part cloud, or a sparse cloud)
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Directory for the sparse cloud and the report
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    out: PathBuf,

    /// Directory to save one point cloud per tree to
    #[arg(long, value_name = "DIR")]
    savetrees: Option<PathBuf>,

    /// JSON file with analysis parameters; flags take precedence
    #[arg(long, value_name = "JSON")]
    config: Option<PathBuf>,

    /// Grid scale in meters; best at about ten times the point spacing
    #[arg(long)]
    cellsize: Option<f64>,

    /// Depth above the ground omitted from the sparse cloud
    #[arg(long)]
    grounddepth: Option<f64>,

    /// Canopy thickness for a cell to count as part of a tree
    #[arg(long)]
    slicedepth: Option<f64>,

    /// Join this many cells per side to bridge gaps inside a crown
    #[arg(long)]
    joinedcells: Option<u32>,

    /// UTM zone of the cloud's georeference
    #[arg(long)]
    utmzone: Option<u8>,

    #[arg(long, conflicts_with = "southern")]
    northern: bool,

    #[arg(long)]
    southern: bool,

    /// Write ascii instead of binary little endian clouds
    #[arg(long)]
    ascii: bool,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn params(&self) -> Result<ForestParams, AppError> {
        let mut params = match &self.config {
            Some(path) => serde_json::from_reader(BufReader::new(File::open(path)?))?,
            None => ForestParams::default(),
        };
        if let Some(v) = self.cellsize {
            params.cellsize = v;
        }
        if let Some(v) = self.grounddepth {
            params.grounddepth = v;
        }
        if let Some(v) = self.slicedepth {
            params.slicedepth = v;
        }
        if let Some(v) = self.joinedcells {
            params.joinedcells = v;
        }
        if let Some(v) = self.utmzone {
            params.utm_zone = v;
        }
        if self.northern {
            params.southern = false;
        }
        if self.southern {
            params.southern = true;
        }
        params.validate()?;
        Ok(params)
    }

    fn options(&self) -> Result<RunOptions, AppError> {
        Ok(RunOptions {
            input: self.input.clone(),
            out_dir: self.out.clone(),
            savetrees: self.savetrees.clone(),
            params: self.params()?,
            encoding: if self.ascii {
                Encoding::Ascii
            } else {
                Encoding::BinaryLittleEndian
            },
        })
    }
}

fn main() -> ExitCode {
    let args = Cli::parse();

    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(
            None,
            if args.verbose {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            },
        )
        .parse_env("RUST_LOG")
        .init();

    log::info!("input file: {}", args.input.display());
    log::info!("output folder: {}", args.out.display());

    let start = std::time::Instant::now();
    let result = args.options().and_then(|options| {
        log::info!("parameters: {:?}", options.params);
        run(&options)
    });

    match result {
        Ok(trees) => {
            log::info!("found {} trees", trees.len());
            log::info!("Elapsed: {:?}", start.elapsed());
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("params.json");
        std::fs::write(&config, r#"{ "cellsize": 0.25, "joinedcells": 5, "utm_zone": 33 }"#)
            .unwrap();
        let cli = Cli::parse_from([
            "forestutils",
            "cloud.ply",
            "--config",
            config.to_str().unwrap(),
            "--joinedcells",
            "2",
            "--northern",
        ]);
        let params = cli.params().unwrap();
        assert_eq!(params.cellsize, 0.25);
        assert_eq!(params.joinedcells, 2);
        assert_eq!(params.utm_zone, 33);
        assert!(!params.southern);
        assert_eq!(params.slicedepth, 0.6);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let cli = Cli::parse_from(["forestutils", "cloud.ply", "--utmzone", "0"]);
        assert!(matches!(cli.params(), Err(AppError::Params(_))));
    }

    #[test]
    fn hemisphere_flags_conflict() {
        let parsed = Cli::try_parse_from(["forestutils", "a.ply", "--northern", "--southern"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn ascii_flag_selects_encoding() {
        let cli = Cli::parse_from(["forestutils", "a.ply", "--ascii", "-o", "out"]);
        let options = cli.options().unwrap();
        assert_eq!(options.encoding, Encoding::Ascii);
        assert_eq!(options.out_dir, PathBuf::from("out"));
    }
}

use std::path::PathBuf;

use pcd_forest::ParamsError;
use pcd_parser::ParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("invalid parameters: {0}")]
    Params(#[from] ParamsError),
    #[error("failed to write report: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid config file: {0}")]
    Config(#[from] serde_json::Error),
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

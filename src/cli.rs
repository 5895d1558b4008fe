use clap::Parser;

use crate::config::{
    DEFAULT_EXTENSION, DEFAULT_METADATA_FILENAME, DEFAULT_ZIP64_WINDOW, ValidatorConfig,
};
use crate::error::{Error, Result};
use crate::fixture::FixtureOptions;
use crate::io::is_http_url;
use crate::pyramid::{ArrayData, Scaler};
use crate::zip::Compression;

#[derive(Parser, Debug)]
#[command(name = "ozxcheck")]
#[command(version)]
#[command(about = "Check zipped OME-Zarr (.ozx) archives against the packaging rules", long_about = None)]
#[command(after_help = "Exit status: 0 conformant, 1 a rule failed, 2 error.\n\n\
Examples:\n  \
  ozxcheck image.ozx                          validate a local archive\n  \
  ozxcheck --json https://example.com/a.ozx   validate a remote archive, JSON report\n  \
  ozxcheck --generate --shape 3,256,256 --dim-order cyx out/test.ozx\n  \
                                              write a synthetic pyramid, then validate it")]
pub struct Cli {
    /// Archive path or HTTP URL
    #[arg(value_name = "FILE|URL")]
    pub file: String,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Write a synthetic pyramid to FILE first (a bare file name goes to a temporary directory)
    #[arg(long)]
    pub generate: bool,

    /// Shape of the generated level 0 array
    #[arg(long, value_delimiter = ',', default_values = ["100", "100"], requires = "generate")]
    pub shape: Vec<usize>,

    /// One axis symbol per dimension (t: time, c: channel, others: space)
    #[arg(long, default_value = "yx", requires = "generate")]
    pub dim_order: String,

    /// Pixel size per axis, e.g. x=0.5,y=0.5
    #[arg(long, value_delimiter = ',', value_parser = parse_axis_value, requires = "generate")]
    pub pixel_size: Vec<(char, f64)>,

    /// Translation per axis, e.g. x=10,y=20
    #[arg(long, value_delimiter = ',', value_parser = parse_axis_value, requires = "generate")]
    pub translation: Vec<(char, f64)>,

    /// Chunk shape (default: 10 per dimension)
    #[arg(long, value_delimiter = ',', requires = "generate")]
    pub chunks: Option<Vec<usize>>,

    /// Store chunks directly instead of in one shard per level
    #[arg(long, requires = "generate")]
    pub no_shards: bool,

    /// Highest pyramid level
    #[arg(long, default_value_t = 4, requires = "generate")]
    pub max_level: usize,

    /// Downscale factor between levels
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u16).range(2..), requires = "generate")]
    pub downscale: u16,

    /// Omit the ZIP64 end records
    #[arg(long, requires = "generate")]
    pub no_zip64: bool,

    /// Omit the archive comment
    #[arg(long, requires = "generate")]
    pub no_comment: bool,

    /// DEFLATE entries at LEVEL instead of storing them
    #[arg(long, value_name = "LEVEL", value_parser = clap::value_parser!(u32).range(0..=9), requires = "generate")]
    pub deflate: Option<u32>,

    /// Name of the per-node metadata document
    #[arg(long, default_value = DEFAULT_METADATA_FILENAME)]
    pub metadata_filename: String,

    /// Expected archive extension
    #[arg(long, default_value = DEFAULT_EXTENSION)]
    pub extension: String,

    /// Trailing bytes searched for the ZIP64 locator
    #[arg(long, default_value_t = DEFAULT_ZIP64_WINDOW)]
    pub zip64_window: u64,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only errors in the log, no report on success
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        is_http_url(&self.file)
    }

    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Error;
        }
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }

    pub fn validator_config(&self) -> ValidatorConfig {
        ValidatorConfig {
            metadata_filename: self.metadata_filename.clone(),
            extension: self.extension.clone(),
            zip64_window: self.zip64_window,
            ..ValidatorConfig::default()
        }
    }

    pub fn fixture_options(&self) -> Result<FixtureOptions> {
        let ndim = self.shape.len();
        if self.dim_order.chars().count() != ndim {
            return Err(Error::InvalidParameter(format!(
                "--dim-order {:?} does not match --shape with {ndim} dimensions",
                self.dim_order
            )));
        }

        let mut options = FixtureOptions {
            dim_order: self.dim_order.clone(),
            chunks: self.chunks.clone().unwrap_or_else(|| vec![10; ndim]),
            sharded: !self.no_shards,
            scaler: Scaler {
                downscale: self.downscale as usize,
                max_level: self.max_level,
            },
            metadata_filename: self.metadata_filename.clone(),
            ..FixtureOptions::default()
        };
        if !self.pixel_size.is_empty() {
            options.pixel_size = self.pixel_size.iter().copied().collect();
        }
        options.translation = self.translation.iter().copied().collect();
        options.writer.zip64 = !self.no_zip64;
        if self.no_comment {
            options.writer.comment.clear();
        }
        if let Some(level) = self.deflate {
            options.writer.compression = Compression::Deflate(level);
        }
        Ok(options)
    }

    /// A deterministic test pattern of the requested shape.
    pub fn synthetic_data(&self) -> Result<ArrayData> {
        if self.shape.is_empty() || self.shape.contains(&0) {
            return Err(Error::InvalidParameter(format!(
                "--shape {:?} must have nonzero dimensions",
                self.shape
            )));
        }
        Ok(ArrayData::from_fn(self.shape.clone(), |index| {
            (index.iter().sum::<usize>() % 256) as f64
        }))
    }
}

/// Parse `x=0.5` into an axis symbol and a value.
fn parse_axis_value(s: &str) -> std::result::Result<(char, f64), String> {
    let (axis, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected AXIS=VALUE, got {s:?}"))?;
    let mut symbols = axis.trim().chars();
    let (Some(symbol), None) = (symbols.next(), symbols.next()) else {
        return Err(format!("axis must be a single symbol, got {axis:?}"));
    };
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid value for {symbol}: {e}"))?;
    Ok((symbol, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ozxcheck").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn parses_axis_values() {
        assert_eq!(parse_axis_value("x=0.5"), Ok(('x', 0.5)));
        assert_eq!(parse_axis_value(" z = 2 "), Ok(('z', 2.0)));
        assert!(parse_axis_value("xy=1").is_err());
        assert!(parse_axis_value("x").is_err());
        assert!(parse_axis_value("x=abc").is_err());
    }

    #[test]
    fn defaults_match_the_library() {
        let cli = parse(&["image.ozx"]);
        assert_eq!(cli.validator_config(), ValidatorConfig::default());
        assert_eq!(cli.log_level(), log::LevelFilter::Warn);
        assert!(!cli.is_http_url());
    }

    #[test]
    fn generate_options_map_onto_fixture_options() {
        let cli = parse(&[
            "--generate",
            "--shape",
            "2,64,64",
            "--dim-order",
            "cyx",
            "--pixel-size",
            "x=0.5,y=0.5",
            "--no-shards",
            "--no-zip64",
            "--deflate",
            "9",
            "out.ozx",
        ]);
        let options = cli.fixture_options().unwrap();
        assert_eq!(options.chunks, vec![10, 10, 10]);
        assert!(!options.sharded);
        assert!(!options.writer.zip64);
        assert_eq!(options.writer.compression, Compression::Deflate(9));
        assert_eq!(options.pixel_size.get(&'x'), Some(&0.5));
        assert_eq!(cli.synthetic_data().unwrap().shape(), &[2, 64, 64]);
    }

    #[test]
    fn fixture_flags_need_generate() {
        let result = Cli::try_parse_from(["ozxcheck", "--no-zip64", "image.ozx"]);
        assert!(result.is_err());
    }

    #[test]
    fn dim_order_must_match_shape() {
        let cli = parse(&["--generate", "--shape", "10,10", "--dim-order", "zyx", "a.ozx"]);
        assert!(cli.fixture_options().is_err());
    }
}

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "img-shrink",
    about = "A local, quality-driven image compressor for JPEG, PNG and WebP",
    long_about = "img-shrink recompresses JPEG, PNG and WebP images at a single quality setting. \
                  Files and whole folders are accepted; unsupported files are skipped. \
                  A single result is written as compressed_<name>, several results are bundled into one zip.",
    version,
    after_help = "EXAMPLES:\n  \
    img-shrink compress photo.jpg -q 70 -o ./out\n  \
    img-shrink compress ./holiday \"./scans/*.png\" -m 1280\n  \
    img-shrink sweep ./holiday -q 90,75,50"
)]
pub struct Args {
    #[arg(short = 'Q', long, global = true, help = "Only print errors")]
    pub quiet: bool,

    #[arg(short, long, global = true, help = "Print debug logging")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(
        about = "Compress files and folders at one quality",
        long_about = "Compress every accepted image found in the inputs and write the result. \
                      Exactly one result is written as a single file; several are bundled into a zip archive."
    )]
    Compress {
        #[command(flatten)]
        common: CommonArgs,

        #[arg(
            short = 'q',
            long,
            env = "IMG_SHRINK_QUALITY",
            help = "Compression quality (1-100, default: 80)",
            long_help = "Compression quality from 1 (lowest) to 100 (highest). \
                         For PNG: >=90 uses Zopfli, >=70 uses high compression, <70 uses standard compression."
        )]
        quality: Option<u8>,
    },

    #[command(
        about = "Re-run the same inputs at several qualities",
        long_about = "Add the inputs at the first quality, then move the quality through each following value. \
                      Prints the compressed size of every file at every quality and writes the final results."
    )]
    Sweep {
        #[command(flatten)]
        common: CommonArgs,

        #[arg(
            short = 'q',
            long,
            required = true,
            value_delimiter = ',',
            help = "Comma-separated qualities to try in order, e.g. 90,75,50"
        )]
        qualities: Vec<u8>,
    },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct CommonArgs {
    #[arg(
        required = true,
        help = "Input files, folders or glob patterns",
        long_help = "Input can be any mix of files, folders and glob expressions. \
                     Folders are searched recursively. Examples: './images', '*.jpg'"
    )]
    pub inputs: Vec<String>,

    #[arg(short = 'o', long, default_value = ".", help = "Output directory")]
    pub output: PathBuf,

    #[arg(
        short = 'm',
        long,
        help = "Maximum long edge in pixels (default: 1920, 0 disables)",
        long_help = "Images larger than this on their long edge are scaled down, keeping aspect ratio. \
                     Smaller images are never enlarged."
    )]
    pub max_dimension: Option<u32>,

    #[arg(
        long,
        help = "Output size safeguard in KiB (default: 10240)",
        long_help = "If a compressed file is larger than this, the encoder retries with lower quality \
                     or smaller dimensions, up to --passes attempts."
    )]
    pub max_size_kb: Option<u64>,

    #[arg(long, help = "Maximum encoder passes per file (default: 10)")]
    pub passes: Option<u8>,

    #[arg(
        short = 'j',
        long,
        help = "Number of parallel threads (default: auto)",
        long_help = "Number of threads for parallel processing. \
                     If not specified, uses number of CPU cores, reduced when memory is tight."
    )]
    pub threads: Option<usize>,

    #[arg(long, help = "Maximum folder depth to search (default: 32)")]
    pub max_depth: Option<usize>,

    #[arg(long, help = "Maximum number of files to accept (default: 10000)")]
    pub max_files: Option<usize>,

    #[arg(
        long,
        help = "Give up on files still running after this many seconds per batch",
        long_help = "Files still being compressed when the timeout elapses are reported as failed. \
                     Without this flag every file runs to completion."
    )]
    pub timeout: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_sweep_qualities() {
        let args = Args::parse_from(["img-shrink", "sweep", "a.jpg", "-q", "90,75,50"]);
        match args.command {
            Commands::Sweep { qualities, common } => {
                assert_eq!(qualities, vec![90, 75, 50]);
                assert_eq!(common.inputs, vec!["a.jpg".to_string()]);
                assert_eq!(common.output, PathBuf::from("."));
            }
            _ => panic!("expected sweep"),
        }
    }

    #[test]
    fn test_parse_compress_options() {
        let args = Args::parse_from([
            "img-shrink", "-v", "compress", "a.jpg", "dir", "-q", "55", "-m", "0", "-j", "2",
        ]);
        assert!(args.verbose);
        match args.command {
            Commands::Compress { quality, common } => {
                assert_eq!(quality, Some(55));
                assert_eq!(common.inputs.len(), 2);
                assert_eq!(common.max_dimension, Some(0));
                assert_eq!(common.threads, Some(2));
            }
            _ => panic!("expected compress"),
        }
    }
}

pub mod batch;
pub mod cancel;
pub mod cli;
pub mod constants;
pub mod error;
pub mod export;
pub mod formats;
pub mod intake;
pub mod logger;
pub mod processing;
pub mod record;
pub mod state;
pub mod utils;
pub mod workspace;

pub use batch::{run_batch, BatchJob, BatchResult};
pub use cancel::CancelToken;
pub use error::{CompressionError, Result};
pub use export::{derive_output_name, export_all, export_one, Artifact};
pub use formats::ImageKind;
pub use intake::{collect_dropped, collect_picked, expand_inputs, filter_supported, IntakeLimits};
pub use processing::{compress_source, CompressedOutput, CompressionOptions, Quality};
pub use record::{ImageRecord, RecordId, RecordStatus, SourceFile};
pub use state::Collection;
pub use utils::{format_bytes, format_reduction, reduction_percent};
pub use workspace::{BatchSummary, Observer, Workspace};

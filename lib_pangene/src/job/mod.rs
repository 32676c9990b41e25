//! The processor framework: typed options, composable processors, and the
//! per-block parallel job runner with a deterministic merge.

mod blocks_jobs;
mod options;
mod output;
mod processor;

pub use blocks_jobs::{run_blocks_jobs, BlocksJobs};
pub use options::{OptValue, Options};
pub use output::{print_blocks, PrintBlock};
pub use processor::{apply, Context, Processor};

//! Detect the files and directories that changed between two git snapshots
//!
//! ```ignore
//! let repository = Repository::open(Path::new("."), Box::new(std::io::stdout()))?;
//! let diff = repository.detect(&DetectOptions::default())?;
//! repository.print_diff(&diff, &OutputOptions::default())?;
//! ```

pub mod areas;
pub mod artifacts;
pub mod commands;

//! File outputs for each pipeline stage.
//!
//! # Submodules
//!
//! - [`table`]: CSV files of collected and classified articles
//! - [`json`]: The summary report as JSON
//!
//! # Output Structure
//!
//! A full `run` writes:
//!
//! ```text
//! output_dir/
//! ├── fraud_articles.csv           # collect
//! ├── fraud_analysis_results.csv   # analyze
//! └── fraud_summary.json           # summarize
//! ```

pub mod json;
pub mod table;

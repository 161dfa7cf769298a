//! Yield-friendly batch processing for the CMS client
//!
//! Large arrays (pages in a folder listing, anchors in a long document)
//! are processed in batches, with the scheduler yielding control between
//! batches so a single job never monopolizes the executor. The primitive
//! is independent of the CMS domain and usable on its own.
//!
//! # Example
//!
//! ```
//! use cms_batch::Batcher;
//!
//! # async fn example() -> cms_batch::Result<()> {
//! let batcher = Batcher::new(50)?;
//! let report = batcher.run(vec![1, 2, 3], |n| n * 2).await;
//! assert_eq!(report.results, vec![2, 4, 6]);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod scheduler;

pub use error::{Error, Result};
pub use scheduler::{BatchReport, Batcher};

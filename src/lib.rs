//! # knn survival
//!
//! k-nearest-neighbour survival prediction - predict how long a patient lives
//! from how long their closest neighbours lived (or were followed up).
//!
//! ## what you get
//!
//! - at-risk accounting over censored times
//! - brute-force euclidean neighbour ranking (parallel w/ the `parallel` feature)
//! - a survival score per patient from its k neighbours' survival curve
//! - concordance index that handles right-censoring
//! - balanced fold partitions + nested cross-validation to pick k
//!
//! ## quick start
//!
//! ```rust
//! use knn_survival::{KnnSurvival, SurvivalData};
//! use ndarray::Array2;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let times = vec![2.0, 4.0, 6.0, 8.0, 9.0];
//! let censored = vec![false, false, true, false, true]; // true = lost to follow-up
//! let features = Array2::from_shape_vec((5, 2), vec![
//!     0.1, 1.0,
//!     0.3, 0.8,
//!     0.9, 0.1,
//!     1.1, 0.0,
//!     1.0, 0.2,
//! ])?;
//! let data = SurvivalData::new(times, censored, features)?;
//!
//! let mut model = KnnSurvival::new().with_k(3);
//! model.fit(&data)?;
//!
//! // higher score = expected to survive longer
//! let scores = model.predict(data.features())?;
//! assert_eq!(scores.len(), 5);
//! # Ok(())
//! # }
//! ```

pub mod data;
pub mod risk_set;
pub mod neighbors;
pub mod model;
pub mod metrics;
pub mod partition;
pub mod cv;
pub mod error;

pub use data::SurvivalData;
pub use model::{KnnSurvival, Prediction, SurvivalCurve, TestLabels};
pub use partition::{FoldPartition, PartitionConfig};
pub use cv::{cv_accuracy, cv_tune, AccuracyResult, FailedFoldPolicy, TuneConfig, TuneResult};
pub use error::{KnnSurvivalError, Result};

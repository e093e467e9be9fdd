pub mod error;
pub mod config;
pub mod validation;
pub mod progress;
pub mod cost;
pub mod optimizer;
pub mod registration;
pub mod multires;
pub mod series;

pub use error::{RegistrationError, Result};
pub use config::RegistrationConfig;
pub use progress::{ConsoleProgressCallback, EvaluationInfo, HistoryCallback, LevelInfo, ProgressCallback, ProgressTracker};
pub use cost::{CostList, CostTerm, PROPERTY_GRADIENT};
pub use optimizer::{Minimizer, MinimizerStatus, Problem};
pub use registration::RegistrationProblem;
pub use multires::{pyramid_sizes, MultiResolutionRegistration};
pub use series::{RegisteredSeries, SeriesRegistration, SeriesTransforms};

pub mod calibrator;
pub mod master;
pub mod matcher;
pub mod score;

pub use calibrator::{subtract_masters, CalibrationOutcome, Calibrator, UncalibratedReason};
pub use master::MasterFrame;
pub use matcher::{CalibrationMatcher, CandidateReport, MasterMatch};
pub use score::{exposure_ratio, MatchScore, MatchTarget};

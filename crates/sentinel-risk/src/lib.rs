//! Risk scoring and position sizing.
//!
//! `RiskAssessor` scores each cycle on five weighted factors and returns a
//! `RiskAssessment` with a level, a size recommendation and protective exit
//! distances. `PositionSizer` turns that recommendation into an entry size.

mod assessor;
mod position_sizer;

pub use assessor::{RiskAssessment, RiskAssessor, RiskConfig, RiskFactors, RiskInput, RiskLevel};
pub use position_sizer::{PositionSizer, SizingMode};

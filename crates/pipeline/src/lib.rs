//! Sales pipeline core: stage transitions, the closing workflow, and the
//! analytics derived from stage history.
//!
//! Everything here is synchronous and side-effect free. Callers supply
//! opportunity and quota records and get updated records or derived
//! summaries back; persistence, transport, and auth live with the callers.

pub mod closing;
pub mod command;
pub mod error;
pub mod forecast;
pub mod opportunity;
pub mod stage;
pub mod transition;
pub mod velocity;

pub use closing::{ClosingWorkflowValidator, PendingClose};
pub use command::DraftTransition;
pub use error::PipelineError;
pub use forecast::{forecast, ForecastSummary, MonthlyForecast, Quota};
pub use opportunity::{Opportunity, StageHistoryEntry};
pub use stage::{Stage, StageDefinition, StageRegistry};
pub use transition::{StageTransitionEngine, TransitionOutcome};
pub use velocity::{
    bottlenecks, sales_cycle, stage_velocity, trends, SalesCycleSummary, StageVelocityRecord,
    VelocityTrend, BOTTLENECK_FACTOR,
};

//! Activity state engine: deterministic attempt generation, credit
//! propagation and persistence for nested learning activities.

pub mod attempt;
pub mod config;
pub mod error;
pub mod propagate;
pub mod protocol;
pub mod reducer;
pub mod report;
pub mod rng;
pub mod seeds;
pub mod select;
pub mod sequence;
pub mod serialize;
pub mod session;
pub mod single_doc;
pub mod source;
pub mod state;
pub mod telemetry;
pub mod util;
pub mod variants;

pub use error::{EngineError, ErrorKind, Result};
pub use reducer::{activity_state_reducer, ActivityAction, EngineEvent, ReduceContext, Reduced};
pub use session::ActivitySession;
pub use source::ActivitySource;
pub use state::{ActivityState, NumVariantsTable};

//! Dispatch policies.

mod cost;
mod priority;

pub use cost::CostController;
pub use priority::{PriorityController, PriorityMode};

use super::microgrid::Microgrid;
use super::types::{StepDispatch, StepInput};

/// A dispatch policy run once per step.
///
/// The controller decides the flows for `input` and applies them to the
/// devices, which it borrows mutably for the duration of the call.
pub trait Controller {
    fn dispatch(&mut self, input: &StepInput, mg: &mut Microgrid) -> StepDispatch;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

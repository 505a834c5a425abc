//! Ordered data-collection steps shared by creating and editing an order.

pub mod input;
pub mod navigation;
pub mod screens;

pub use input::{apply, StepContext, StepInput, StepOutcome};
pub use navigation::{entry_step, next_step};
pub use screens::prompt;

//! Domain models for FlowMD.

mod bed;
mod patient;
mod symptom;
mod view;
mod visit;

pub use bed::*;
pub use patient::*;
pub use symptom::*;
pub use view::*;
pub use visit::*;

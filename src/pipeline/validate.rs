//! The `Validation` stage.
//!
//! Currently unconditional: marks the state as validated and leaves the answer
//! untouched. This is the hook for content-safety or grounding checks.

use crate::pipeline::state::PipelineState;

pub fn run(state: &mut PipelineState) {
    state.validation_passed = true;
}

//! The pipeline stage trait.
//!
//! A [`PipelineStage`] turns the frames queued in one [`SampleFifo`] into
//! frames appended to another. Stages never own their buffers: the
//! [`Engine`](crate::Engine) owns every FIFO and lends an input/output pair to
//! each stage for the duration of one `process` call. The same FIFO can be
//! the output of one stage and the input of the next, and the roles are
//! reassigned when the engine rewires its chain.
//!
//! ## Design Decisions
//!
//! - **Work-unit granularity**: a stage consumes only as much input as whole
//!   work units allow. Leftover frames stay queued for the next call.
//!
//! - **Not-ready is not an error**: calling `process` before enough input
//!   exists is a no-op.
//!
//! - **Object-safe**: `dyn PipelineStage` works, so the engine can run its
//!   stages through one code path regardless of chain order.

use crate::fifo::SampleFifo;

/// A streaming processing stage between two FIFOs.
///
/// # Example
///
/// ```rust
/// use retempo_core::{PipelineStage, SampleFifo};
///
/// /// Halves the level of every frame.
/// struct Attenuate;
///
/// impl PipelineStage for Attenuate {
///     fn process(&mut self, input: &mut SampleFifo, output: &mut SampleFifo) {
///         let frames = input.frame_count();
///         let spare = output.spare_mut(frames);
///         for (out, inp) in spare.iter_mut().zip(input.as_slice()) {
///             *out = inp * 0.5;
///         }
///         output.commit(frames);
///         input.consume(frames);
///     }
///
///     fn reset(&mut self) {}
/// }
///
/// let mut input = SampleFifo::new();
/// let mut output = SampleFifo::new();
/// input.append(&[1.0, -1.0], 0, 1);
/// Attenuate.process(&mut input, &mut output);
/// assert_eq!(output.as_slice(), &[0.5, -0.5]);
/// ```
pub trait PipelineStage {
    /// Consumes whole work units from `input` and appends the results to
    /// `output`.
    fn process(&mut self, input: &mut SampleFifo, output: &mut SampleFifo);

    /// Clears internal state carried between calls, keeping parameters.
    fn reset(&mut self);
}

//! Analysis task lifecycle
//!
//! A driver owns the tasks and calls, in order:
//!
//! 1. [`AnalysisTask::create_output_objects`] once, before any event;
//! 2. [`AnalysisTask::user_exec`] once per event, sequentially;
//! 3. [`AnalysisTask::terminate`] once, after the last event.
//!
//! Tasks never call back into the driver. Their results are read through
//! [`AnalysisTask::outputs`].

use crate::event::InputEvent;
use crate::output::TaskOutputs;
use crate::CepResult;

pub trait AnalysisTask {
    /// Unique task name, used as key in the output file
    fn name(&self) -> &str;

    /// Book histograms and trees
    fn create_output_objects(&mut self) -> CepResult<()>;

    /// Process one event. Events the task cannot handle are skipped.
    fn user_exec(&mut self, event: &InputEvent) -> CepResult<()>;

    /// Called after the last event
    fn terminate(&mut self) -> CepResult<()> {
        Ok(())
    }

    /// Output slots filled so far
    fn outputs(&self) -> &TaskOutputs;
}

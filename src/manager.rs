//! Sequential analysis driver
//!
//! The manager owns a set of tasks and drives their lifecycle over an event
//! stream. Events are processed one at a time, in input order; every task
//! sees every event.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::CepError;
use crate::event::InputEvent;
use crate::output::{write_outputs, TaskOutputs};
use crate::task::AnalysisTask;
use crate::CepResult;

/// Iterator over the events of a JSON-lines file
pub struct EventReader<R> {
    reader: R,
    buf: Vec<u8>,
    line_no: usize,
}

impl EventReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> CepResult<Self> {
        let file = File::open(path.as_ref()).map_err(|e| {
            CepError::Io(format!("Failed to open {:?}: {}", path.as_ref(), e))
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> EventReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_no: 0,
        }
    }

    fn malformed(&self, message: String) -> CepError {
        CepError::MalformedEvent {
            line: self.line_no,
            message,
        }
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = CepResult<InputEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
            self.line_no += 1;

            let line = match std::str::from_utf8(&self.buf) {
                Ok(line) => line,
                Err(e) => return Some(Err(self.malformed(e.to_string()))),
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(serde_json::from_str(line).map_err(|e| self.malformed(e.to_string())));
        }
    }
}

/// Lifecycle state of the manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Created,
    Initialized,
    Terminated,
}

/// Counts from one analysis run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub events: u64,
    pub esd_events: u64,
    pub aod_events: u64,
}

pub struct AnalysisManager {
    tasks: Vec<Box<dyn AnalysisTask>>,
    state: ManagerState,
    stats: RunStats,
}

impl Default for AnalysisManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisManager {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            state: ManagerState::Created,
            stats: RunStats::default(),
        }
    }

    /// Register a task; only allowed before initialization
    pub fn add_task(&mut self, task: Box<dyn AnalysisTask>) -> CepResult<()> {
        if self.state != ManagerState::Created {
            return Err(CepError::InvalidParameter(format!(
                "cannot add task '{}' after initialization",
                task.name()
            )));
        }
        if self.tasks.iter().any(|t| t.name() == task.name()) {
            return Err(CepError::InvalidParameter(format!(
                "duplicate task name '{}'",
                task.name()
            )));
        }
        self.tasks.push(task);
        Ok(())
    }

    pub fn tasks(&self) -> impl Iterator<Item = &dyn AnalysisTask> {
        self.tasks.iter().map(|t| t.as_ref())
    }

    pub fn state(&self) -> ManagerState {
        self.state
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Book the outputs of every task
    pub fn init_analysis(&mut self) -> CepResult<()> {
        if self.state != ManagerState::Created {
            return Err(CepError::InvalidParameter(
                "analysis already initialized".to_string(),
            ));
        }
        for task in &mut self.tasks {
            task.create_output_objects()?;
            log::debug!("initialized task '{}'", task.name());
        }
        self.state = ManagerState::Initialized;
        log::info!("Initialized {} task(s)", self.tasks.len());
        Ok(())
    }

    /// Hand one event to every task
    pub fn process_event(&mut self, event: &InputEvent) -> CepResult<()> {
        if self.state != ManagerState::Initialized {
            return Err(CepError::InvalidParameter(
                "events can only be processed after initialization".to_string(),
            ));
        }
        self.stats.events += 1;
        match event {
            InputEvent::Esd(_) => self.stats.esd_events += 1,
            InputEvent::Aod(_) => self.stats.aod_events += 1,
        }
        for task in &mut self.tasks {
            task.user_exec(event)?;
        }
        Ok(())
    }

    /// Process a whole event stream; the first error aborts the run
    pub fn start_analysis<I>(&mut self, events: I) -> CepResult<RunStats>
    where
        I: IntoIterator<Item = CepResult<InputEvent>>,
    {
        for event in events {
            self.process_event(&event?)?;
            if self.stats.events % 10_000 == 0 {
                log::info!("Processed {} events", self.stats.events);
            }
        }
        Ok(self.stats)
    }

    /// Finalize every task
    pub fn terminate(&mut self) -> CepResult<()> {
        if self.state != ManagerState::Initialized {
            return Err(CepError::InvalidParameter(
                "terminate called on an analysis that is not running".to_string(),
            ));
        }
        for task in &mut self.tasks {
            task.terminate()?;
        }
        self.state = ManagerState::Terminated;
        log::info!(
            "Analysis finished: {} events ({} ESD, {} AOD)",
            self.stats.events,
            self.stats.esd_events,
            self.stats.aod_events
        );
        Ok(())
    }

    /// Outputs of every task, keyed by task name
    pub fn outputs(&self) -> impl Iterator<Item = (&str, &TaskOutputs)> {
        self.tasks.iter().map(|t| (t.name(), t.outputs()))
    }

    pub fn write_outputs(&self, path: impl AsRef<Path>) -> CepResult<()> {
        write_outputs(path, self.outputs())
    }
}

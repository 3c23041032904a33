use chrono::{DateTime, Utc};

use crate::pipeline::{Filter, FilterWindow, WindowError, WindowSelector};
use crate::resource::{Resource, VirtualMachine};

/// Forwards compute instances whose lifetime overlaps the window
#[derive(Debug, Clone)]
pub struct VmFilter {
    window: FilterWindow,
}

impl VmFilter {
    /// Resolve the window once; conflicting bounds fail here
    pub fn new(selector: &WindowSelector, now: DateTime<Utc>) -> Result<Self, WindowError> {
        let window = FilterWindow::resolve(selector, now)?;
        tracing::debug!(from = %window.from(), to = %window.to(), "Filter window resolved");
        Ok(Self { window })
    }

    pub fn window(&self) -> &FilterWindow {
        &self.window
    }
}

impl Filter for VmFilter {
    type Item = VirtualMachine;

    fn accept(&self, vm: &VirtualMachine) -> bool {
        let id = match vm.id() {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(error = %e, "Dropping compute instance without id");
                return false;
            }
        };
        let start = match vm.start_time() {
            Ok(start) => start,
            Err(e) => {
                tracing::error!(error = %e, id, "Dropping compute instance without start time");
                return false;
            }
        };
        let end = vm.end_time().unwrap_or_else(|e| {
            tracing::warn!(error = %e, id, "Unreadable end time, treating as running");
            None
        });

        self.window.overlaps(start, end)
    }
}

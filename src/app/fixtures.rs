use crate::app::tree::ClassBinding;

/// Tracks which case type's class fixture is currently set up, so that
/// consecutive leaves of one type share a single set-up/tear-down pair.
#[derive(Debug, Default)]
pub struct FixtureTracker {
    current: Option<ClassBinding>,
    setup_failure: Option<String>,
}

impl FixtureTracker {
    /// Prepares the fixture of the leaf about to run. Moving to another
    /// class, or to a leaf without one, tears the previous class down.
    /// Returns the set-up error when the class could not be set up.
    pub fn enter(&mut self, class: Option<&ClassBinding>) -> Result<(), String> {
        let same = match (&self.current, class) {
            (Some(current), Some(next)) => current.name == next.name,
            (None, None) => true,
            _ => false,
        };
        if !same {
            self.finish();
            if let Some(next) = class {
                debug!("Setting up class {}", next.name);
                if let Err(e) = next.fixture.set_up_class() {
                    error!("Class set-up of {} failed: {}", next.name, e);
                    self.setup_failure = Some(e);
                }
                self.current = Some(next.clone());
            }
        }
        match &self.setup_failure {
            Some(e) => Err(format!("class set-up failed: {}", e)),
            None => Ok(()),
        }
    }

    /// Tears down the current class, if any.
    pub fn finish(&mut self) {
        if let Some(previous) = self.current.take() {
            if self.setup_failure.take().is_none() {
                debug!("Tearing down class {}", previous.name);
                if let Err(e) = previous.fixture.tear_down_class() {
                    error!("Class tear-down of {} failed: {}", previous.name, e);
                }
            }
        }
    }
}

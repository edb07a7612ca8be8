use serde::Serialize;

/// One file the build could not register, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildFailure {
    /// The candidate file.
    pub file: String,
    /// Why it was skipped.
    pub reason: String,
}

/// Outcome of one build run: how many files were registered and, in
/// processing order, which files failed and why.
#[derive(Debug, Default, Clone, Serialize)]
pub struct BuildReport {
    successes: usize,
    failures: Vec<BuildFailure>,
}

impl BuildReport {
    /// Number of files successfully registered.
    pub fn successes(&self) -> usize {
        self.successes
    }

    /// The files that failed, in the order they were processed.
    pub fn failures(&self) -> &[BuildFailure] {
        &self.failures
    }

    /// Whether every candidate file was registered.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn record_success(&mut self) {
        self.successes += 1;
    }

    pub(crate) fn record_failure(&mut self, file: impl Into<String>, reason: impl Into<String>) {
        self.failures.push(BuildFailure {
            file: file.into(),
            reason: reason.into(),
        });
    }
}

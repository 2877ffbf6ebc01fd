use serde::Serialize;

/// Severity of an advisory record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum AdvisorySeverity {
    Debug,
    Info,
    Warn,
    /// A mutation that was simulated instead of performed
    DryRun,
}

impl AdvisorySeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdvisorySeverity::Debug => "DEBUG",
            AdvisorySeverity::Info => "INFO",
            AdvisorySeverity::Warn => "WARN",
            AdvisorySeverity::DryRun => "DRYRUN",
        }
    }
}

/// Structured record emitted by the planning and execution stages
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advisory {
    pub severity: AdvisorySeverity,
    pub message: String,
    pub instance_id: Option<String>,
    pub target_group: Option<String>,
}

impl Advisory {
    pub fn new(severity: AdvisorySeverity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            instance_id: None,
            target_group: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(AdvisorySeverity::Info, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(AdvisorySeverity::Warn, message)
    }

    pub fn debug(message: impl Into<String>) -> Self {
        Self::new(AdvisorySeverity::Debug, message)
    }

    pub fn dry_run(message: impl Into<String>) -> Self {
        Self::new(AdvisorySeverity::DryRun, message)
    }

    pub fn with_instance(mut self, instance_id: &str) -> Self {
        self.instance_id = Some(instance_id.to_string());
        self
    }

    pub fn with_target_group(mut self, target_group: &str) -> Self {
        self.target_group = Some(target_group.to_string());
        self
    }
}

/// Destination for advisory records. Rendering and filtering are up to the implementation.
pub trait AdvisorySink: Send + Sync {
    fn emit(&self, advisory: Advisory);
}

/// Sink that keeps every record in memory, in emission order
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySink {
    records: std::sync::Mutex<Vec<Advisory>>,
}

#[cfg(test)]
impl MemorySink {
    pub fn records(&self) -> Vec<Advisory> {
        self.records.lock().unwrap().clone()
    }

    pub fn with_severity(&self, severity: AdvisorySeverity) -> Vec<Advisory> {
        self.records()
            .into_iter()
            .filter(|a| a.severity == severity)
            .collect()
    }
}

#[cfg(test)]
impl AdvisorySink for MemorySink {
    fn emit(&self, advisory: Advisory) {
        self.records.lock().unwrap().push(advisory);
    }
}

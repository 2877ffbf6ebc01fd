use thiserror::Error;

/// Main error type for asg-unprotect
#[derive(Error, Debug, Clone)]
pub enum UnprotectError {
    #[error("Configuration error: {0}")]
    Config(ConfigError),

    #[error("Input error: {0}")]
    Input(InputError),

    #[error("AWS error: {0}")]
    Aws(AwsError),
}

/// Configuration-related errors
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Errors caused by the shape of the data returned for the ASG or its launch template
#[derive(Error, Debug, Clone)]
pub enum InputError {
    #[error("auto scaling group \"{asg}\" not found")]
    AsgNotFound { asg: String },

    #[error("auto scaling group \"{asg}\" does not use Launch Templates")]
    NoLaunchTemplate { asg: String },

    #[error("missing Launch Template version for instance id {instance_id}")]
    MissingTemplateInfo { instance_id: String },

    #[error("invalid Launch Template version \"{version}\" for instance id {instance_id}")]
    InvalidTemplateVersion { instance_id: String, version: String },

    #[error("Launch Template {name} not found")]
    LaunchTemplateNotFound { name: String },

    #[error("no latest version for Launch Template {name}")]
    NoLatestVersion { name: String },

    #[error("malformed {resource} in response: {reason}")]
    MalformedResponse { resource: String, reason: String },
}

/// AWS-related errors
#[derive(Error, Debug, Clone)]
pub enum AwsError {
    #[error("{operation} failed for {target}: {message}")]
    ServiceError {
        operation: String,
        target: String,
        message: String,
    },
}

impl AwsError {
    pub fn service(operation: &str, target: &str, err: impl std::fmt::Display) -> Self {
        AwsError::ServiceError {
            operation: operation.to_string(),
            target: target.to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for asg-unprotect operations
pub type Result<T> = std::result::Result<T, UnprotectError>;

impl From<ConfigError> for UnprotectError {
    fn from(err: ConfigError) -> Self {
        UnprotectError::Config(err)
    }
}

impl From<InputError> for UnprotectError {
    fn from(err: InputError) -> Self {
        UnprotectError::Input(err)
    }
}

impl From<AwsError> for UnprotectError {
    fn from(err: AwsError) -> Self {
        UnprotectError::Aws(err)
    }
}

impl UnprotectError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            UnprotectError::Config(_) => ErrorSeverity::High,
            UnprotectError::Input(InputError::AsgNotFound { .. }) => ErrorSeverity::Medium,
            UnprotectError::Input(_) => ErrorSeverity::High,
            UnprotectError::Aws(_) => ErrorSeverity::High,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            UnprotectError::Input(InputError::AsgNotFound { asg }) => {
                format!("Auto Scaling Group \"{}\" was not found. Check the name and the AWS region/profile in use.", asg)
            }
            UnprotectError::Input(InputError::NoLaunchTemplate { asg }) => {
                format!("Auto Scaling Group \"{}\" uses a launch configuration; only Launch Template backed groups are supported.", asg)
            }
            UnprotectError::Aws(AwsError::ServiceError { operation, target, .. }) => {
                format!("AWS call {} failed for {}. No retry was attempted; re-run the command once the cause is fixed.", operation, target)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Medium,
    High,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Medium => "MEDIUM",
            ErrorSeverity::High => "HIGH",
        }
    }
}

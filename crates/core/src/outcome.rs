use serde::{Deserialize, Serialize};

/// Severity of the issue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Fatal,
    Error,
    Warning,
    Information,
}

/// Type of issue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum IssueType {
    Invalid,
    Structure,
    Required,
    Value,
    Security,
    Login,
    Forbidden,
    Processing,
    NotSupported,
    Duplicate,
    NotFound,
    Conflict,
    Exception,
    Throttled,
    Informational,
}

/// Human-readable issue text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodeableText {
    pub text: String,
}

/// A single issue within an OperationOutcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationOutcomeIssue {
    pub severity: IssueSeverity,
    pub code: IssueType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<CodeableText>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
}

impl OperationOutcomeIssue {
    pub fn new(severity: IssueSeverity, code: IssueType, message: &str) -> Self {
        Self {
            severity,
            code,
            details: Some(CodeableText {
                text: message.to_string(),
            }),
            diagnostics: None,
        }
    }
}

/// FHIR OperationOutcome resource
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcome {
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub issue: Vec<OperationOutcomeIssue>,
}

impl OperationOutcome {
    pub fn new(issue: Vec<OperationOutcomeIssue>) -> Self {
        Self {
            resource_type: "OperationOutcome".to_string(),
            id: Some(uuid::Uuid::new_v4().to_string()),
            issue,
        }
    }

    /// Error outcome with a single issue
    pub fn error(code: IssueType, message: &str) -> Self {
        Self::new(vec![OperationOutcomeIssue::new(
            IssueSeverity::Error,
            code,
            message,
        )])
    }

    pub fn not_found(message: &str) -> Self {
        Self::error(IssueType::NotFound, message)
    }

    pub fn invalid(message: &str) -> Self {
        Self::error(IssueType::Invalid, message)
    }

    pub fn conflict(message: &str) -> Self {
        Self::error(IssueType::Conflict, message)
    }

    pub fn security(message: &str) -> Self {
        Self::error(IssueType::Security, message)
    }

    /// One `invalid` issue per validation message
    pub fn violations(messages: &[String]) -> Self {
        Self::new(
            messages
                .iter()
                .map(|msg| OperationOutcomeIssue::new(IssueSeverity::Error, IssueType::Invalid, msg))
                .collect(),
        )
    }

    /// Informational outcome (e.g. for `$validate`)
    pub fn success(message: &str) -> Self {
        Self::new(vec![OperationOutcomeIssue::new(
            IssueSeverity::Information,
            IssueType::Informational,
            message,
        )])
    }
}

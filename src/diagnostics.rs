use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiagnosticCode {
    PJ0100UnsupportedShape,
    PJ0200UnreadableAttribute,
    PJ0210PartialSerdeDerive,
}

impl DiagnosticCode {
    pub fn code_str(self) -> &'static str {
        match self {
            DiagnosticCode::PJ0100UnsupportedShape => "PJ0100",
            DiagnosticCode::PJ0200UnreadableAttribute => "PJ0200",
            DiagnosticCode::PJ0210PartialSerdeDerive => "PJ0210",
        }
    }
}

/// A warning: something the generator noticed but could not act on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl Diagnostic {
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            record: None,
            field: None,
        }
    }

    pub fn at(mut self, record: impl Into<String>, field: Option<&str>) -> Self {
        self.record = Some(record.into());
        self.field = field.map(str::to_string);
        self
    }

    pub fn location(&self) -> Option<String> {
        match (&self.record, &self.field) {
            (Some(record), Some(field)) => Some(format!("{record}.{field}")),
            (Some(record), None) => Some(record.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "warning[{}]: {}", self.code.code_str(), self.message)?;
        if let Some(location) = self.location() {
            write!(f, " (at {location})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_and_location() {
        let d = Diagnostic::warning(DiagnosticCode::PJ0100UnsupportedShape, "nested sequence")
            .at("Pattern", Some("grid"));
        assert_eq!(d.to_string(), "warning[PJ0100]: nested sequence (at Pattern.grid)");
    }
}

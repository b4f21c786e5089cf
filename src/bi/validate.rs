// Layout verification for decoded reports

use super::report::{Report, Value};

#[derive(Debug, Clone)]
pub enum ValidationMessage {
    Warning(String),
    Error(String),
}

impl ValidationMessage {
    pub fn is_error(&self) -> bool {
        matches!(self, ValidationMessage::Error(_))
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, ValidationMessage::Warning(_))
    }

    pub fn message(&self) -> &str {
        match self {
            ValidationMessage::Warning(msg) | ValidationMessage::Error(msg) => msg,
        }
    }
}

/// Check that no declared block device overlaps the program binary. Every
/// device that starts below the binary's end address gets its own error.
/// Without a usable end address the check is skipped with a warning.
pub fn verify_layout(report: &Report) -> Vec<ValidationMessage> {
    let mut msgs = Vec::new();

    let binary_end = match report.get_name("BinaryEndAddress") {
        Some(Value::Int(end)) => *end,
        Some(_) => {
            msgs.push(ValidationMessage::Warning(
                "BinaryEndAddress is not a single integer, skipping overlap check".to_string(),
            ));
            return msgs;
        }
        None => {
            msgs.push(ValidationMessage::Warning(
                "No BinaryEndAddress entry, skipping overlap check".to_string(),
            ));
            return msgs;
        }
    };

    let devices = report
        .get_name("BlockDevice")
        .and_then(Value::as_list)
        .unwrap_or_default();

    for device in devices.iter().filter_map(Value::as_device) {
        if device.address < binary_end {
            msgs.push(ValidationMessage::Error(format!(
                "Block device / binary overlap: binary ends at 0x{:04x}, block device '{}' starts at 0x{:04x}",
                binary_end, device.name, device.address
            )));
        }
    }

    msgs
}

/// Check if validation messages contain any errors
pub fn has_errors(messages: &[ValidationMessage]) -> bool {
    messages.iter().any(|m| m.is_error())
}

/// Check if validation messages contain any warnings
pub fn has_warnings(messages: &[ValidationMessage]) -> bool {
    messages.iter().any(|m| m.is_warning())
}

/// Filter out only error messages
pub fn errors_only(messages: &[ValidationMessage]) -> Vec<String> {
    messages
        .iter()
        .filter(|m| m.is_error())
        .map(|m| m.message().to_string())
        .collect()
}

// SPDX-License-Identifier: Apache-2.0

use fundchain_core::{ClientError, ExitCode, MachineError};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct OutputMode {
    pub json: bool,
}

#[derive(Debug)]
pub(crate) struct CliError {
    pub exit_code: ExitCode,
    pub machine: MachineError,
}

impl CliError {
    pub fn usage(message: &str) -> Self {
        Self {
            exit_code: ExitCode::Usage,
            machine: MachineError::new("usage_error", message),
        }
    }

    pub fn internal(message: String) -> Self {
        Self {
            exit_code: ExitCode::Internal,
            machine: MachineError::new("internal_error", &message),
        }
    }
}

impl From<ClientError> for CliError {
    fn from(err: ClientError) -> Self {
        Self {
            exit_code: err.code.exit_code(),
            machine: err.to_machine(),
        }
    }
}

pub(crate) fn emit_ok(output_mode: OutputMode, payload: &Value) -> Result<(), CliError> {
    let text = if output_mode.json {
        serde_json::to_string(payload)
    } else {
        serde_json::to_string_pretty(payload)
    }
    .map_err(|e| CliError::internal(e.to_string()))?;
    println!("{text}");
    Ok(())
}

pub(crate) fn emit_error(error: &CliError, machine_json: bool) {
    if machine_json {
        match serde_json::to_string(&error.machine) {
            Ok(payload) => eprintln!("{payload}"),
            Err(_) => eprintln!(
                "{{\"code\":\"internal_error\",\"message\":\"failed to encode structured error\",\"details\":{{}}}}"
            ),
        }
        return;
    }
    eprintln!("error: {}", error.machine.message);
    for (key, value) in &error.machine.details {
        eprintln!("  {key}: {value}");
    }
}

// SPDX-License-Identifier: Apache-2.0

mod context;
mod model;

pub use context::ResultExt;
pub use model::{
    ClientError, ConfigPathScope, ErrorCode, ExitCode, MachineError, Result, ERROR_CODES,
};

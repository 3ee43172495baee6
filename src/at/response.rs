// ABOUTME: Per-command response record: result code, collected data lines and terminator status
// ABOUTME: Extracts +CME / +CMS numeric sub-codes from the status line

use std::fmt;

use super::error::AtError;
use super::parser::AtParser;

/// How a command finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResultCode {
    Success,
    Timeout,
    Error,
    /// Starting state of every command; also a failed or short write
    #[default]
    IoError,
    IoBroken,
}

impl ResultCode {
    /// Numeric form used in logs: 0 on success, negative otherwise
    pub fn code(self) -> i32 {
        match self {
            ResultCode::Success => 0,
            ResultCode::Timeout => -1,
            ResultCode::Error => -2,
            ResultCode::IoError => -3,
            ResultCode::IoBroken => -4,
        }
    }

    pub fn is_success(self) -> bool {
        self == ResultCode::Success
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ResultCode::Success => "success",
            ResultCode::Timeout => "timeout",
            ResultCode::Error => "error",
            ResultCode::IoError => "io error",
            ResultCode::IoBroken => "io broken",
        };
        write!(f, "{name}")
    }
}

/// What the modem answered to one command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub error: ResultCode,
    /// Data lines claimed by the command, in arrival order
    pub lines: Vec<String>,
    /// The terminator line (`OK`, `ERROR`, `+CME ERROR: 10`, ...)
    pub status: String,
}

impl Response {
    pub(crate) fn with_error(error: ResultCode) -> Self {
        Self {
            error,
            ..Self::default()
        }
    }

    /// First data line, or an empty string
    pub fn data(&self) -> &str {
        self.lines.first().map(String::as_str).unwrap_or("")
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_success()
    }

    pub fn cme_error(&self) -> Option<i32> {
        numeric_status(&self.status, "+CME ERROR")
    }

    pub fn cms_error(&self) -> Option<i32> {
        numeric_status(&self.status, "+CMS ERROR")
    }

    /// Failed without a +CME/+CMS code
    pub fn is_general_error(&self) -> bool {
        !self.is_ok() && self.cme_error().is_none() && self.cms_error().is_none()
    }

    pub fn into_result(self) -> Result<Response, AtError> {
        match self.error {
            ResultCode::Success => Ok(self),
            ResultCode::Timeout => Err(AtError::Timeout),
            ResultCode::IoError => Err(AtError::Io),
            ResultCode::IoBroken => Err(AtError::IoBroken),
            ResultCode::Error => {
                if let Some(code) = self.cme_error() {
                    Err(AtError::Cme(code))
                } else if let Some(code) = self.cms_error() {
                    Err(AtError::Cms(code))
                } else {
                    Err(AtError::Error {
                        status: self.status,
                    })
                }
            }
        }
    }
}

fn numeric_status(status: &str, prefix: &str) -> Option<i32> {
    if !status.starts_with(prefix) {
        return None;
    }
    AtParser::new(status).next_int()
}

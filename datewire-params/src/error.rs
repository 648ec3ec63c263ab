//! Parameter errors

use datewire_core::{codes, DriverError, PackError};
use thiserror::Error;

use crate::SqlType;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("parameter #{index} has not been set")]
    NotSet { index: usize },

    #[error("Not implemented (type is {sql_type})")]
    NotImplemented { index: usize, sql_type: SqlType },

    #[error("Unrecognized type code {0}")]
    UnknownType(i32),

    #[error("parameter #{index} has no formal mapping")]
    Unmapped { index: usize },

    #[error("parameter #{index}: expected {expected} value, found {found}")]
    ValueType {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{found} value cannot be sent as a datetime")]
    NotTemporal { found: &'static str },

    #[error(transparent)]
    Pack(#[from] PackError),
}

impl From<ParamError> for DriverError {
    fn from(err: ParamError) -> Self {
        match &err {
            ParamError::NotSet { index } => {
                DriverError::new(codes::PARAMETER_NOT_SET, err.to_string())
                    .for_parameter(*index)
                    .with_suggestion("Bind a value to every input parameter before executing")
            }
            ParamError::NotImplemented { index, .. } => {
                DriverError::new(codes::NOT_IMPLEMENTED, err.to_string()).for_parameter(*index)
            }
            ParamError::UnknownType(code) => {
                DriverError::new(codes::INVALID_DATA_TYPE, err.to_string())
                    .with_value(code.to_string())
            }
            ParamError::Unmapped { index } => {
                DriverError::new(codes::GENERAL, err.to_string())
                    .for_parameter(*index)
                    .with_suggestion("Call create_parameter_mapping first")
            }
            ParamError::ValueType { index, .. } => {
                DriverError::new(codes::INVALID_DATA_TYPE, err.to_string()).for_parameter(*index)
            }
            ParamError::NotTemporal { .. } => {
                DriverError::new(codes::INVALID_DATA_TYPE, err.to_string())
            }
            ParamError::Pack(e) => {
                DriverError::from(*e).with_note("while packing a temporal parameter")
            }
        }
    }
}

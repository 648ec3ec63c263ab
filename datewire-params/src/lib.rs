//! datewire params - Parameter bookkeeping
//!
//! Everything a prepared statement needs before its parameters go on the
//! wire:
//! - `count_parameters`: placeholder counting outside string literals
//! - `verify_parameters_set`: every input parameter has a value
//! - `create_parameter_mapping`: formal names, server types and lengths
//! - `declarations`: the `@P1 integer, ...` declaration list

mod error;
mod mapping;
mod profile;
mod types;

pub use error::ParamError;
pub use mapping::{
    count_parameters, create_parameter_mapping, declarations, map_parameters,
    verify_parameters_set,
};
pub use profile::{Charset, CharsetKind, ServerProfile, TdsVersion};
pub use types::{MaxLength, ParamValue, ParameterListItem, SqlType};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{ParamError, ParamValue, ParameterListItem, ServerProfile, SqlType};
    pub use crate::{
        count_parameters, create_parameter_mapping, declarations, verify_parameters_set,
    };
}

//! Runtime core for a statically typed, reference-counted language: tagged
//! values, the block allocator, the numeric tower, byte buffers, chars, and
//! the structural equality and hash engines over them.

use prelude::Value;

pub mod options;
pub mod runtime;
pub mod utils;

pub mod prelude {
    pub use super::RtResult;
    pub use crate::runtime::{
        equality::{equal, equal_ref},
        error::RuntimeError,
        factory::*,
        hash::{hash, hash_value},
        number::{make_float32, make_float64, make_int32, make_int64, make_integer, Number},
        value::{Value, Word},
    };
}

pub type RtResult<T = Value> = Result<T, runtime::error::RuntimeError>;

pub mod arith;
pub mod bytevector;
pub mod char;
pub mod composite;
pub mod equality;
pub mod error;
pub mod factory;
pub mod fmt;
pub mod hash;
pub mod heap;
pub mod number;
pub mod object;
pub mod parse;
pub mod string;
pub mod value;

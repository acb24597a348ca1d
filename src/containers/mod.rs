//! Packed integer containers
//!
//! Space-efficient integer sequences packed into `u64` word arrays, with
//! fixed per-element widths ([`FixedIntVec`]) or caller-tracked variable
//! widths ([`VarIntVec`]).

pub mod fixed_int_vec;
pub mod var_int_vec;

pub use fixed_int_vec::FixedIntVec;
pub use var_int_vec::VarIntVec;

#![forbid(unsafe_code)]

pub mod canonical;
pub mod device;
pub mod identity;
pub mod ids;

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod address;
pub mod completion;
pub mod error;
pub mod interfaces;

pub use address::{Endpoint, IpAddress, IpFamily};
pub use completion::{Completion, Recorder};
pub use error::{ErrorCode, NetResult};

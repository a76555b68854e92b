mod codec;
mod error;
mod lttb;
mod point;

pub use codec::*;
pub use error::{Error, Result};
pub use lttb::*;
pub use point::*;

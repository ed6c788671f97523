// SPDX-License-Identifier: MIT

mod log;
mod progress;
mod string;

pub use self::log::*;
pub use self::progress::*;
pub use self::string::*;

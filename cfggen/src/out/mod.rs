// SPDX-License-Identifier: MIT

pub mod target;

// SPDX-License-Identifier: MIT

pub mod config;
pub mod errors;
pub mod out;
pub mod pipeline;
pub mod request;
pub mod utils;

pub use errors::{ProvisionError, ProvisionResult};
pub use pipeline::{ProvisionPlan, ProvisionReport, plan, plan_tables, provision};
pub use request::ProvisionRequest;

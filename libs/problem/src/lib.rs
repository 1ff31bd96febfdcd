//! RFC 9457 Problem Details for the HTTP adapters, plus static error
//! definitions (`ErrDef`) that modules use as their error catalog.

mod catalog;
mod problem;

pub use catalog::ErrDef;
pub use problem::{
    bad_request, internal_error, not_found, Problem, ProblemResponse, ValidationError,
    APPLICATION_PROBLEM_JSON,
};

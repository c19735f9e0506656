//! JARVICE client library
//!
//! Job API gateway, job wait primitive and vault transfers, layered as
//! domain → application → infrastructure → cli.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

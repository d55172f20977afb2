// src/lib.rs — Library root for Viral Daily

pub mod app;
pub mod backend;
pub mod catalog;
pub mod cli;
pub mod feed;
pub mod infra;
pub mod payment;
pub mod session;
pub mod util;

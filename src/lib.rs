//! Core library for matching new users to communities and subgroups

pub mod config;
pub mod data;
pub mod graph;
pub mod cluster;
pub mod model;
pub mod placement;
pub mod storage;
pub mod service;
pub mod report;

pub use anyhow::{Result, anyhow};

pub mod accession;
pub mod app;
pub mod aspera;
pub mod assembly;
pub mod checksum;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod manifest;
pub mod output;
pub mod portal;
pub mod query;
pub mod transfer;
pub mod wgs;

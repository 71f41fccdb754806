#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

pub mod api;
pub mod cli;
pub mod climate;
pub mod data;
pub mod error;
pub mod grid;
pub mod importer;
pub mod network;
mod prelude;
pub mod reanalysis;
pub mod tables;
pub mod technology;
pub mod timezone;
pub mod topology;

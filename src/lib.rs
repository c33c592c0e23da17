#![allow(async_fn_in_trait)]
pub mod archive;
pub mod catalog;
pub mod collection;
pub mod config;
pub mod error;
pub mod fetch;
pub mod geometry;
pub mod region;

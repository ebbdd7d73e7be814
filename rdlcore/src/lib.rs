//! Runtime around the rdl expression engine.
//!
//! This crate drives report rendering on top of [`rdlexpr`]: it folds the
//! expression trees of a [`render::ReportDefinition`], evaluates them row by
//! row on worker threads and feeds custom report items (pluggable regions,
//! possibly loaded from dynamic libraries) with their evaluated properties.
//! Most embedders only need [`base::EngineContext`] and the [`render`] module.

pub mod base;
pub mod item;
pub mod magic;
pub mod render;
pub mod utils;

pub extern crate rdlexpr;
pub extern crate semver;
pub extern crate uuid;

//! # regroove-core
//!
//! Pattern state, candidate generation and transport sync for the regroove
//! controller, independent of any transport to the host.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use regroove_core::archive::JsonArchive;
//! use regroove_core::config::Config;
//! use regroove_core::controller::Controller;
//! use regroove_core::generation::{GenerationOrchestrator, VariationModel};
//! use regroove_core::sync::SyncEngine;
//!
//! // 1. Engine parameters from the embedded config plus user overrides
//! let config = Config::load();
//! let settings = config.engine_settings();
//!
//! // 2. Generator and pattern archive
//! let generator = GenerationOrchestrator::new(Box::new(VariationModel::new()), Some(state_dir));
//! let archive = JsonArchive::open(user_dir)?;
//!
//! // 3. Controller thread owning the engine
//! let engine = SyncEngine::new(settings, generator, Box::new(archive));
//! let (events_tx, events_rx) = crossbeam_channel::unbounded();
//! let (mut controller, sender) = Controller::new(engine, events_tx);
//! controller.startup();
//! std::thread::spawn(move || controller.run());
//!
//! // 4. Feed host messages through `sender`, forward `events_rx` to the host
//! ```
//!
//! ## Module Overview
//!
//! - [`state`]: current/source/stash slots, history buffer, control parameters
//! - [`generation`]: rhythm model trait, single-flight builds, session files
//! - [`sync`]: wait / snap / toggle sync engine and the commit gate
//! - [`marshal`]: display grid and playback event encodings
//! - [`dispatch`]: range-checked application of control actions
//! - [`controller`]: owner thread and gated ingress handle
//! - [`archive`]: named pattern storage
//! - [`config`] / [`paths`]: configuration layering and data directories

pub mod archive;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod generation;
pub mod marshal;
pub mod paths;
pub mod state;
pub mod sync;

pub use regroove_types as types;

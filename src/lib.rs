// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Project memory kept inside one GitHub repository.
//!
//! Ghkeep stores documentation for many projects in a single remote
//! repository. Each project owns a __namespace__, i.e., a top-level folder of
//! that repository, picked up from a `.ghkeep.toml` marker somewhere above
//! the current directory. Every file operation is expressed in logical paths
//! relative to the active namespace.
//!
//! No local clone is involved. Content is read and written straight through
//! the hosting API, with each mutation carrying the content hash it last saw
//! so concurrent writers cannot silently clobber each other.

pub mod config;
pub mod detect;
pub mod github;
pub mod manager;
pub mod path;
pub mod scaffold;
pub mod server;
pub mod store;

pub use config::{ConfigResolver, GlobalIdentity, MergedConfig};
pub use github::GitHubStore;
pub use manager::FileManager;
pub use store::RemoteStore;

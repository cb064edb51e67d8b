//! # confluence
//!
//! Blocking Confluence Cloud REST client.
//!
//! This crate provides:
//! - [`ConfluenceClient`], a [`provision::ResourceClient`] over the
//!   `/wiki/rest/api` endpoints (groups, memberships, spaces, pages, blog
//!   posts, permissions and lookups)
//! - [`ClientConfig`], the site URL and credentials, read from the
//!   `CONFLUENCE_*` environment variables or passed explicitly
//! - [`classify`], the single place where HTTP statuses and response bodies
//!   are mapped onto [`provision::ErrorKind`]
//!
//! ## Example
//!
//! ```no_run
//! use confluence::{ClientConfig, ConfluenceClient};
//! use provision::{Manifest, NoProgress, Orchestrator, RunOptions};
//!
//! let client = ConfluenceClient::new(ClientConfig::from_env()?);
//! let manifest = Manifest::load("site.toml".as_ref())?;
//!
//! let report = Orchestrator::new(&client, RunOptions::default())
//!     .run(&manifest, &mut NoProgress)?;
//! println!("{} item(s) failed", report.totals().failed);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error Classification
//!
//! | Response                                          | Kind           |
//! |---------------------------------------------------|----------------|
//! | 409, or a 4xx body saying the resource exists     | AlreadyExists  |
//! | 404                                               | NotFound       |
//! | 408, 429, 5xx, timeouts                           | Transient      |
//! | 401, unreachable host                             | FatalTransport |
//! | anything else                                     | Permanent      |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
mod wire;

pub use client::ConfluenceClient;
pub use config::{ClientConfig, DEFAULT_TIMEOUT, ENV_API_TOKEN, ENV_EMAIL, ENV_URL};
pub use error::{Error, Result, classify};
pub use wire::User;

//! # navcheck-core
//!
//! UI-test action helpers for a turn-by-turn navigation demo app.
//!
//! The helpers drive the app through an on-device automation agent: they
//! select elements from the accessibility hierarchy, simulate taps and long
//! presses, poll until the screen reaches an expected state and fail with a
//! descriptive reason when it does not.
//!
//! ## Modules
//!
//! - [`navigation`] - The drive-navigation helpers ([`navigation::DriveNavigation`])
//! - [`interaction`] - Visibility assertions and gestures the helpers are built on
//! - [`wait`] - Named polling conditions with timeout and interval
//! - [`driver`] - The [`driver::AutomationDriver`] trait
//! - [`agent_driver`] / [`agent_client`] / [`protocol`] - The TCP agent backend
//! - [`matcher`] / [`element`] / [`color`] - Accessibility tree model and element matching
//! - [`simulation`] - Positioning data source snapshots and settings
//! - [`config`] - Persistent configuration in `~/.navcheck/config.json`
//! - [`step`] - Per-helper step log
//! - [`ids`] - Accessibility identifiers of the demo app
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use navcheck_core::agent_driver::AgentDriver;
//! use navcheck_core::config::NavcheckConfig;
//! use navcheck_core::driver::AutomationDriver;
//! use navcheck_core::navigation::DriveNavigation;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = NavcheckConfig::load();
//! let mut driver = AgentDriver::new(config.agent.host.clone(), config.agent.port);
//! driver.connect().await?;
//!
//! let nav = DriveNavigation::from_config(Arc::new(driver), &config);
//! nav.dismiss_alert().await?;
//! let eta = nav.estimated_arrival_data().await?;
//! println!("{}", eta);
//! # Ok(())
//! # }
//! ```

pub mod agent_client;
pub mod agent_driver;
pub mod color;
pub mod config;
pub mod driver;
pub mod element;
pub mod ids;
pub mod interaction;
pub mod matcher;
pub mod navigation;
pub mod protocol;
pub mod simulation;
pub mod step;
pub mod wait;

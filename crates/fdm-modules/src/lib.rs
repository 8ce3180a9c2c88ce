//! # fdm-modules
//!
//! Resource modules for the FDM REST API built on [`fdm_core`].
//!
//! ## Modules
//!
//! - [`args`] - Declarative argument schemas and validation
//! - [`resources`] - Built-in resource definitions (`FlexConfigPolicy`, `FlexConfigObject`)
//! - [`module`] - Module entry points and run options
//! - [`upload`] - The file upload module
//! - [`cli`] - Helpers of the `fdm-module` runner
//!
//! ## Example
//!
//! ```no_run
//! use fdm_modules::module::{Module, ResourceModule};
//! use fdm_modules::resources::flex_config_policy;
//! use fdm_core::Params;
//! use serde_json::json;
//!
//! # async fn example() {
//! let args = Params::from_value(json!({
//!     "hostname": "https://127.0.0.1:8585",
//!     "access_token": "ACCESS_TOKEN",
//!     "refresh_token": "REFRESH_TOKEN",
//!     "operation": "upsertFlexConfigPolicy",
//!     "name": "Ansible FlexConfigPolicy",
//!     "type": "flexconfigpolicy"
//! }))
//! .unwrap();
//!
//! let result = ResourceModule::new(flex_config_policy()).run(&args).await;
//! println!("{}", serde_json::to_string(&result).unwrap());
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod args;
pub mod cli;
pub mod module;
pub mod resources;
pub mod upload;

pub use module::{Module, ModuleOptions, ResourceModule};
pub use upload::FileUploadModule;

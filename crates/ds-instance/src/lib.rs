//! Directory-backed game instances for the deepslate launcher.
//!
//! An [`Instance`] is one configured game installation: a root directory
//! holding a flat `instance.cfg` plus a fixed layout of game subdirectories
//! and some cached facts about the installed jar. [`InstanceManager`]
//! discovers every valid instance under a root folder and shares group
//! membership with them through a [`GroupRegistry`].
//!
//! ```no_run
//! use ds_instance::InstanceManager;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut manager = InstanceManager::new(InstanceManager::default_dir()?);
//!     manager.discover()?;
//!     for instance in manager.instances() {
//!         println!("{} ({})", instance.name(), instance.instance_id());
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
mod container;
mod hooks;
mod instance;
mod lists;
mod manager;

pub use config::{ConfigFile, ConfigValue};
pub use container::InstanceContainer;
pub use hooks::{
    EasterEggIconResolver, IconResolver, InstanceHooks, JarVersionSniffer, NullJarSniffer,
    VERSION_UNKNOWN,
};
pub use instance::{CONFIG_FILE_NAME, Instance, InstanceType, is_valid_instance};
pub use lists::{ModList, TexturePackList, WorldList};
pub use manager::{GROUPS_FILE_NAME, GroupRegistry, InstanceManager, InstanceManagerError};

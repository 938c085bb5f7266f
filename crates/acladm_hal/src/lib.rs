//! acladm Hardware Abstraction Layer (HAL)
//!
//! Everything acladm does outside its own memory goes through here:
//! spawning the NFSv4 ACL tools and reading ownership and mode bits.

pub mod command;
pub mod error;
pub mod facl;
pub mod fs;

pub use command::{Command, CommandResult};
pub use error::{HalError, HalResult};
pub use facl::Nfs4FaclTool;
pub use fs::FileOwnership;

// src/services/mod.rs
// DOCUMENTATION: Services module organization
// PURPOSE: Re-export service components

pub mod passwords;
pub mod rate_limit;

pub use passwords::*;
pub use rate_limit::*;

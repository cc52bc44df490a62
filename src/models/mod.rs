// src/models/mod.rs
// DOCUMENTATION: Models module organization
// PURPOSE: Re-export gym profile components

pub mod contact;
pub mod gym;
pub mod hours;

pub use contact::*;
pub use gym::*;
pub use hours::*;

// src/models/mod.rs

pub mod attempt;
pub mod audio;
pub mod certificate;
pub mod module;
pub mod progress;
pub mod user;

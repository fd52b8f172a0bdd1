// src/handlers/mod.rs

pub mod admin;
pub mod audio;
pub mod auth;
pub mod certificate;
pub mod modules;
pub mod progress;
pub mod quiz;

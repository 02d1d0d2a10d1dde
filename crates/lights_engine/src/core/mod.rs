//! # Core Engine Module
//!
//! Shared configuration used by every subsystem. Settings structs live in
//! [`config`]; file loading comes from [`crate::config::Config`].

pub mod config;

pub use crate::foundation;

pub use config::{
    ApplicationConfig, Config, ConfigError, EngineConfig, ShaderConfig, VulkanRendererConfig, WindowConfig,
};

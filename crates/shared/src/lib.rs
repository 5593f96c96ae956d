//! Shared configuration, identity and transport types for Campus.
//!
//! This crate provides the pieces every other crate leans on:
//! - Layered application configuration
//! - Identity claims carried by access tokens
//! - JWT validation (issuance lives with the external identity provider)
//! - SMTP email transport

pub mod auth;
pub mod config;
pub mod email;
pub mod jwt;

pub use auth::Claims;
pub use config::{
    AppConfig, CacheConfig, DatabaseConfig, EmailConfig, EnrollmentConfig, JwtSettings,
    ServerConfig,
};
pub use email::{EmailError, EmailService};
pub use jwt::{JwtConfig, JwtError, JwtService};

//! # Meal Planner API Server Library
//!
//! HTTP surface of the meal planner: routing, authentication middleware, request
//! validation and error mapping on top of `mealplan-shared`.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;

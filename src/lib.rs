//! Telco Churn Predictor
//!
//! A single-page form that collects customer attributes, runs them through a
//! pre-trained binary classifier and shows a churn verdict with its probability.
//!
//! # Modules
//!
//! - `app`: Router construction and OpenAPI document.
//! - `classifier`: Model contract and the JSON model artifact.
//! - `collector`: Input collection and range/choice enforcement.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `inference`: Record assembly and the inference call.
//! - `model_store`: Loading and schema-checking the model at startup.
//! - `models`: Record and API data models.
//! - `render`: Server-rendered HTML pages.
//! - `schema`: Declared field tables.

pub mod app;
pub mod classifier;
pub mod collector;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod inference;
pub mod model_store;
pub mod models;
pub mod render;
pub mod schema;

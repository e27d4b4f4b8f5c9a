//! Certwatch server
//!
//! Startup registration of the certwatch HTTP routes and alert rule types,
//! and the host adapters that make them runnable on their own.
//!
//! ## Architecture
//!
//! - `router`: route manifest types, the [`HostRouter`] trait and
//!   [`register_routes`], plus the axum-backed [`AxumRouter`]
//! - `rules`: the status and TLS rule types, the [`RuleTypeRegistry`] trait,
//!   [`register_rules`] and the [`InMemoryRuleRegistry`]
//! - `sources`: certificate and monitor status inputs for the rules
//! - `handler`: response envelope, [`ApiError`] and the route manifest
//! - `config`: layered [`CertwatchConfig`]
//! - `app`: [`bootstrap`], which wires all of the above together

pub mod app;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod rules;
pub mod sources;

pub use app::{bootstrap, plugin_setup, Certwatch};
pub use config::CertwatchConfig;
pub use error::{ConfigError, HostError, RegistrationError, RuleError};
pub use handler::{certwatch_routes, ApiError, ApiResponse, AppState, Clock, ErrorInfo};
pub use router::{
    register_routes, AxumRouter, BodyRule, HostRouter, RouteConfig, RouteDefinition,
    RouteHandler, RouteRequest, RouteSummary, RouteValidation, Verb,
};
pub use rules::{
    register_rules, Alert, InMemoryRuleRegistry, PluginSetup, RuleDescriptor, RuleType,
    RuleTypeRegistry, STATUS_RULE_ID, TLS_RULE_ID,
};
pub use sources::{
    CertSource, MonitorState, MonitorStatus, MonitorStatusSource, StaticCertSource,
    StaticMonitorSource,
};

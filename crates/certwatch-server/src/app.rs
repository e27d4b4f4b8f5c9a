//! Startup wiring
//!
//! Registration runs once, synchronously: rule types first, then the route
//! manifest that serves them. Route state holds the finished rule registry,
//! so no route is mounted for a partially registered rule set. Any failure
//! aborts startup.

use axum::Router;
use certwatch_core::Localizer;
use std::sync::Arc;
use tracing::info;

use crate::config::CertwatchConfig;
use crate::error::{ConfigError, RegistrationError};
use crate::handler::{certwatch_routes, AppState, Clock};
use crate::router::{register_routes, AxumRouter, RouteSummary};
use crate::rules::{register_rules, InMemoryRuleRegistry, PluginSetup, RuleDescriptor};
use crate::sources::{StaticCertSource, StaticMonitorSource};

/// A fully registered service, ready to serve
pub struct Certwatch {
    pub router: Router,
    pub rules: Arc<InMemoryRuleRegistry>,
    pub descriptors: Vec<RuleDescriptor>,
    /// Registered routes, in manifest order
    pub routes: Vec<RouteSummary>,
}

/// Build the rule collaborators described by `config`
///
/// Unset source paths yield empty sources.
pub fn plugin_setup(config: &CertwatchConfig) -> Result<PluginSetup, ConfigError> {
    let certificates = match &config.sources.certificates {
        Some(path) => StaticCertSource::from_file(path)?,
        None => StaticCertSource::default(),
    };
    let monitors = match &config.sources.monitors {
        Some(path) => StaticMonitorSource::from_file(path)?,
        None => StaticMonitorSource::default(),
    };
    let localizer: Arc<dyn Localizer> = Arc::new(config.localizer());

    Ok(PluginSetup {
        settings: config.tls,
        localizer,
        certificates: Arc::new(certificates),
        monitors: Arc::new(monitors),
    })
}

/// Register rules and routes for `setup`
pub fn bootstrap(setup: PluginSetup, clock: Clock) -> Result<Certwatch, RegistrationError> {
    let mut registry = InMemoryRuleRegistry::new();
    let descriptors = register_rules(&setup, &mut registry)?;
    let rules = Arc::new(registry);

    let state = AppState::new(
        setup.settings,
        setup.localizer.clone(),
        setup.certificates.clone(),
        rules.clone(),
    )
    .with_clock(clock);

    let manifest = certwatch_routes(Arc::new(state));
    let routes: Vec<RouteSummary> = manifest.iter().map(RouteSummary::from).collect();

    let mut host = AxumRouter::new();
    let route_count = register_routes(manifest, &mut host)?;

    info!(
        rules = descriptors.len(),
        routes = route_count,
        "certwatch registered"
    );

    Ok(Certwatch {
        router: host.into_router(),
        rules,
        descriptors,
        routes,
    })
}

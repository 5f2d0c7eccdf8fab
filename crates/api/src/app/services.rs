//! Service wiring: the kernel over the in-memory store, plus cookie settings.

use gatehouse_infra::{CookieConfig, GatehouseConfig, InMemoryStore};
use gatehouse_kernel::{Gatehouse, Guard, HandleAction};

pub struct AppServices {
    gatehouse: Gatehouse<InMemoryStore>,
    cookies: CookieConfig,
}

impl AppServices {
    pub fn new(gatehouse: Gatehouse<InMemoryStore>, cookies: CookieConfig) -> Self {
        Self { gatehouse, cookies }
    }

    pub fn from_config(config: &GatehouseConfig) -> Self {
        Self::new(
            Gatehouse::new(InMemoryStore::new(), config.settings.clone()),
            config.cookies.clone(),
        )
    }

    pub fn gatehouse(&self) -> &Gatehouse<InMemoryStore> {
        &self.gatehouse
    }

    pub fn cookies(&self) -> &CookieConfig {
        &self.cookies
    }

    /// Whether the named action carries an anti-forgery guard (i.e. changes state).
    ///
    /// Unknown names answer `false`; dispatch reports them properly.
    pub fn requires_token(&self, area: &str, action: &str) -> bool {
        self.gatehouse
            .handler(area)
            .and_then(|handler| {
                handler
                    .resolve(action)
                    .map(|a| a.guards().contains(&Guard::Token))
            })
            .unwrap_or(false)
    }
}

//! Application-wide state, created once at startup and passed explicitly to
//! whatever needs it.

use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, warn};

use crate::api::{ApiClient, CampaignSource, MenuSource};
use crate::auth::{Session, SessionData};
use crate::cache::QueryContext;
use crate::config::Config;
use crate::hydrator::{CategoryHydrator, HydratorSettings};
use crate::models::{Campaign, MenuItem};

pub struct AppContext {
    pub config: Config,
    pub config_path: PathBuf,
    pub session: Session,
    pub api: ApiClient,
    pub menu: QueryContext<MenuItem>,
    pub campaigns: QueryContext<Campaign>,
}

impl AppContext {
    /// Load config (with environment overrides) and any persisted session.
    pub fn load() -> Result<Self> {
        let config_path = Config::config_path()?;
        let mut config = match Config::load_from(&config_path) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };
        config.apply_env_overrides();

        let cache_dir = Config::cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
        debug!(?cache_dir, "Cache directory configured");

        let mut session = Session::new(cache_dir);
        if let Err(e) = session.load() {
            warn!(error = %e, "Failed to load session");
        }

        Self::new(config, config_path, session)
    }

    pub fn new(config: Config, config_path: PathBuf, session: Session) -> Result<Self> {
        let mut api = ApiClient::new(config.api_base_url())?;
        if let Some(token) = session.data.as_ref().filter(|d| !d.is_expired()).map(|d| d.token.clone()) {
            api.set_token(token);
        }

        let settings = config.hydrator_settings();
        Ok(Self {
            menu: QueryContext::with_times(settings.stale_time, settings.cache_time),
            campaigns: QueryContext::with_times(settings.stale_time, settings.cache_time),
            config,
            config_path,
            session,
            api,
        })
    }

    pub fn settings(&self) -> HydratorSettings {
        self.config.hydrator_settings()
    }

    pub fn business_id(&self) -> Option<String> {
        if !self.session.is_valid() {
            return None;
        }
        self.session.business_id().map(str::to_string)
    }

    pub fn menu_hydrator(&self) -> CategoryHydrator<MenuSource> {
        let settings = self.settings();
        let source = MenuSource::new(self.api.clone(), settings.page);
        CategoryHydrator::mount(source, self.menu.clone(), self.business_id(), settings)
    }

    pub fn campaign_hydrator(&self) -> CategoryHydrator<CampaignSource> {
        let source = CampaignSource::new(self.api.clone());
        CategoryHydrator::mount(
            source,
            self.campaigns.clone(),
            self.business_id(),
            self.settings(),
        )
    }

    /// Adopt a fresh session: persist it, remember the email, use the token.
    pub fn sign_in(&mut self, data: SessionData) -> Result<()> {
        self.api.set_token(data.token.clone());
        self.config.last_email = Some(data.email.clone());
        self.session.update(data);
        self.session.save()?;
        if let Err(e) = self.config.save_to(&self.config_path) {
            warn!(error = %e, "Failed to save config");
        }
        Ok(())
    }

    pub fn sign_out(&mut self) -> Result<()> {
        self.session.clear()?;
        self.api = ApiClient::new(self.config.api_base_url())?;
        Ok(())
    }
}

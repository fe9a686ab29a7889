use super::event::{Event, EventCategory};
use crate::error::StoreError;
use crate::storage::DurableStore;
use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Presence flag written on the first banner interaction.
pub const CONSENT_KEY: &str = "cookie-consent";
/// Structured settings blob.
pub const SETTINGS_KEY: &str = "cookie-settings";

const LIFECYCLE_PREFIXES: &[&str] = &["cookie_consent", "cookie_banner", "cookie_settings", "consent_"];
const LIFECYCLE_MARKERS: &[&str] = &["consent_accepted", "consent_declined", "banner_shown"];

/// Per-category flags as stored under [`SETTINGS_KEY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentSettings {
    #[serde(default = "always_true")]
    pub essential: bool,
    #[serde(default)]
    pub analytics: bool,
    #[serde(default)]
    pub marketing: bool,
    #[serde(default)]
    pub personalization: bool,
}

fn always_true() -> bool {
    true
}

impl Default for ConsentSettings {
    fn default() -> Self {
        Self::essential_only()
    }
}

impl ConsentSettings {
    pub fn essential_only() -> Self {
        Self {
            essential: true,
            analytics: false,
            marketing: false,
            personalization: false,
        }
    }

    pub fn all() -> Self {
        Self {
            essential: true,
            analytics: true,
            marketing: true,
            personalization: true,
        }
    }

    pub fn allows(&self, category: EventCategory) -> bool {
        match category {
            EventCategory::Essential => true,
            EventCategory::Analytics => self.analytics,
            EventCategory::Marketing => self.marketing,
            EventCategory::Personalization => self.personalization,
        }
    }
}

/// The user's current privacy choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub has_consented: bool,
    pub settings: ConsentSettings,
}

impl ConsentRecord {
    pub fn granted(settings: ConsentSettings) -> Self {
        Self {
            has_consented: true,
            settings,
        }
    }
}

/// Decides whether an event may be recorded. Pure.
pub struct ConsentGate;

impl ConsentGate {
    pub fn allows(category: EventCategory, consent: Option<&ConsentRecord>) -> bool {
        if category == EventCategory::Essential {
            return true;
        }
        consent.is_some_and(|record| record.has_consented && record.settings.allows(category))
    }

    /// `allows`, plus the bypass for consent telemetry which has to work
    /// before any consent exists.
    pub fn permits(event: &Event, consent: Option<&ConsentRecord>) -> bool {
        is_consent_lifecycle_event(event.name()) || Self::allows(event.category(), consent)
    }
}

pub fn is_consent_lifecycle_event(name: &str) -> bool {
    let normalized: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect();

    LIFECYCLE_PREFIXES
        .iter()
        .any(|prefix| normalized.starts_with(prefix))
        || LIFECYCLE_MARKERS
            .iter()
            .any(|marker| normalized.contains(marker))
}

/// Reads and writes the consent record through a [`DurableStore`].
///
/// The last loaded record is cached so the gate can consult it on every
/// event without touching storage. Writes replace the record wholesale.
pub struct ConsentStore {
    store: Arc<dyn DurableStore>,
    cached: ArcSwapOption<ConsentRecord>,
}

impl ConsentStore {
    /// Create the store and prime the cache from storage.
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        let consent = Self {
            store,
            cached: ArcSwapOption::empty(),
        };
        consent.reload();
        consent
    }

    /// Current record, if the user has made any decision. Lock-free.
    pub fn current(&self) -> Option<ConsentRecord> {
        self.cached.load().as_deref().copied()
    }

    /// Re-read storage into the cache and return the result.
    pub fn reload(&self) -> Option<ConsentRecord> {
        let record = self.load();
        self.cached.store(record.map(Arc::new));
        record
    }

    /// Read the record from storage. Storage or parse failures are logged
    /// and read as "no consent".
    pub fn load(&self) -> Option<ConsentRecord> {
        let flag = match self.store.get(CONSENT_KEY) {
            Ok(flag) => flag,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read consent flag");
                return None;
            }
        };
        if flag.as_deref().map(str::trim) != Some("true") {
            return None;
        }

        let settings = match self.store.get(SETTINGS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<ConsentSettings>(&raw) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!(error = %e, "malformed consent settings, treating as no consent");
                    return None;
                }
            },
            Ok(None) => ConsentSettings::essential_only(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read consent settings");
                return None;
            }
        };

        Some(ConsentRecord::granted(ConsentSettings {
            essential: true,
            ..settings
        }))
    }

    pub fn save(&self, settings: ConsentSettings) -> Result<ConsentRecord, StoreError> {
        let settings = ConsentSettings {
            essential: true,
            ..settings
        };
        let json = serde_json::to_string(&settings)?;
        self.store.set(SETTINGS_KEY, &json)?;
        self.store.set(CONSENT_KEY, "true")?;

        let record = ConsentRecord::granted(settings);
        self.cached.store(Some(Arc::new(record)));
        tracing::info!(
            analytics = settings.analytics,
            marketing = settings.marketing,
            personalization = settings.personalization,
            "consent saved"
        );
        Ok(record)
    }

    pub fn accept_all(&self) -> Result<ConsentRecord, StoreError> {
        self.save(ConsentSettings::all())
    }

    pub fn decline_all(&self) -> Result<ConsentRecord, StoreError> {
        self.save(ConsentSettings::essential_only())
    }

    /// Forget every decision; the banner would be shown again.
    pub fn reset(&self) -> Result<(), StoreError> {
        self.store.remove(CONSENT_KEY)?;
        self.store.remove(SETTINGS_KEY)?;
        self.cached.store(None);
        Ok(())
    }
}

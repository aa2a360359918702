//! Per-site request lifecycle and the single-flight guard.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use crate::error::StudioError;

/// A place in the studio that issues generation requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationSite {
    CharacterGeneration,
    BackgroundGeneration,
    Restyle,
    Variations,
    SceneComposition,
    MaskedEdit,
}

impl OperationSite {
    pub fn label(self) -> &'static str {
        match self {
            OperationSite::CharacterGeneration => "character generation",
            OperationSite::BackgroundGeneration => "background generation",
            OperationSite::Restyle => "character restyle",
            OperationSite::Variations => "variation generation",
            OperationSite::SceneComposition => "scene composition",
            OperationSite::MaskedEdit => "image edit",
        }
    }

    /// User-facing message for a failed service call at this site
    pub fn failure_message(self) -> &'static str {
        match self {
            OperationSite::CharacterGeneration => "Character generation failed. Please try again.",
            OperationSite::BackgroundGeneration => {
                "Background generation failed. Please try again."
            }
            OperationSite::Restyle => "Character restyling failed. Please try again.",
            OperationSite::Variations => "Could not generate variations. Please try again.",
            OperationSite::SceneComposition => "Scene generation failed. Please try again.",
            OperationSite::MaskedEdit => "Image editing failed. Please try again.",
        }
    }
}

impl fmt::Display for OperationSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle of the latest request at one site
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestState {
    #[default]
    Idle,
    Requesting,
    Succeeded,
    Failed(String),
}

impl RequestState {
    pub fn is_requesting(&self) -> bool {
        matches!(self, RequestState::Requesting)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RequestState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Request state of every site; locked only for short, non-async updates
#[derive(Debug, Default)]
pub struct SiteTable {
    states: Mutex<HashMap<OperationSite, RequestState>>,
}

impl SiteTable {
    pub fn state(&self, site: OperationSite) -> RequestState {
        self.lock(|states| states.get(&site).cloned().unwrap_or_default())
    }

    /// Mark `site` as requesting, clearing its previous error.
    /// Fails with `Busy` if a request is already in flight there.
    pub fn begin(&self, site: OperationSite) -> Result<SiteGuard<'_>, StudioError> {
        self.lock(|states| {
            let state = states.entry(site).or_default();
            if state.is_requesting() {
                return Err(StudioError::Busy(site));
            }
            *state = RequestState::Requesting;
            Ok(())
        })?;
        Ok(SiteGuard {
            table: self,
            site,
            settled: false,
        })
    }

    fn set(&self, site: OperationSite, state: RequestState) {
        self.lock(|states| {
            states.insert(site, state);
        });
    }

    fn lock<R>(&self, f: impl FnOnce(&mut HashMap<OperationSite, RequestState>) -> R) -> R {
        // The map is always left consistent, so a poisoned lock is still usable
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut states)
    }
}

/// Holds a site in `Requesting` until settled.
/// Dropping it unsettled (a cancelled future) resets the site to `Idle`.
#[derive(Debug)]
pub struct SiteGuard<'a> {
    table: &'a SiteTable,
    site: OperationSite,
    settled: bool,
}

impl SiteGuard<'_> {
    pub fn site(&self) -> OperationSite {
        self.site
    }

    pub fn succeed(mut self) {
        self.settled = true;
        self.table.set(self.site, RequestState::Succeeded);
    }

    pub fn fail(mut self, message: impl Into<String>) {
        self.settled = true;
        self.table.set(self.site, RequestState::Failed(message.into()));
    }
}

impl Drop for SiteGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.table.set(self.site, RequestState::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_begin_is_busy() {
        let table = SiteTable::default();
        let guard = table.begin(OperationSite::SceneComposition).unwrap();
        assert!(table.state(OperationSite::SceneComposition).is_requesting());

        let err = table.begin(OperationSite::SceneComposition).unwrap_err();
        assert!(matches!(err, StudioError::Busy(OperationSite::SceneComposition)));
        assert_eq!(err.to_string(), "scene composition is already in progress");

        // Other sites are independent
        table.begin(OperationSite::MaskedEdit).unwrap().succeed();
        drop(guard);
    }

    #[test]
    fn test_settle_and_restart_clears_error() {
        let table = SiteTable::default();
        table.begin(OperationSite::Restyle).unwrap().fail("boom");
        assert_eq!(table.state(OperationSite::Restyle).error(), Some("boom"));

        let guard = table.begin(OperationSite::Restyle).unwrap();
        assert_eq!(table.state(OperationSite::Restyle), RequestState::Requesting);
        guard.succeed();
        assert_eq!(table.state(OperationSite::Restyle), RequestState::Succeeded);
    }

    #[test]
    fn test_dropped_guard_resets_to_idle() {
        let table = SiteTable::default();
        let guard = table.begin(OperationSite::Variations).unwrap();
        drop(guard);
        assert_eq!(table.state(OperationSite::Variations), RequestState::Idle);
        assert!(table.begin(OperationSite::Variations).is_ok());
    }
}

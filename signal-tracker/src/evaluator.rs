//! Signal-state evaluator
//!
//! Recomputes every site's state from scratch for a given position. A site
//! is green when the vehicle is within the threshold distance (inclusive),
//! red otherwise. Sites never influence each other and nothing is carried
//! over between calls.

use crate::geo::haversine_m;
use crate::types::{SignalSite, SignalState, TrackedPosition};
use serde::Serialize;
use std::ops::Index;

/// Evaluates the fixed registry of signal sites against a position
#[derive(Debug, Clone)]
pub struct SignalEvaluator {
    sites: Vec<SignalSite>,
    threshold_m: f64,
}

impl SignalEvaluator {
    /// Create an evaluator over `sites` with a green threshold in meters
    pub fn new(sites: Vec<SignalSite>, threshold_m: f64) -> Self {
        Self { sites, threshold_m }
    }

    pub fn sites(&self) -> &[SignalSite] {
        &self.sites
    }

    pub fn threshold_m(&self) -> f64 {
        self.threshold_m
    }

    /// Classify a single distance
    pub fn classify(&self, distance_m: f64) -> SignalState {
        if distance_m <= self.threshold_m {
            SignalState::Green
        } else {
            SignalState::Red
        }
    }

    /// Compute the state of every registered site for `position`
    pub fn evaluate(&self, position: &TrackedPosition) -> SignalStates {
        let sites = self
            .sites
            .iter()
            .map(|site| {
                let distance_m = haversine_m(
                    position.latitude,
                    position.longitude,
                    site.latitude,
                    site.longitude,
                );
                let state = self.classify(distance_m);
                log::trace!("{}: {:.1} m -> {}", site.name, distance_m, state);

                SiteStatus {
                    name: site.name.clone(),
                    latitude: site.latitude,
                    longitude: site.longitude,
                    distance_m,
                    state,
                }
            })
            .collect();

        SignalStates { sites }
    }
}

/// Evaluated status of one signal site
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteStatus {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Great-circle distance from the vehicle in meters
    pub distance_m: f64,
    pub state: SignalState,
}

/// Result of one evaluation, in registry order
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct SignalStates {
    sites: Vec<SiteStatus>,
}

impl SignalStates {
    /// State of the named site, if registered
    pub fn get(&self, name: &str) -> Option<SignalState> {
        self.status(name).map(|s| s.state)
    }

    /// Full status of the named site, if registered
    pub fn status(&self, name: &str) -> Option<&SiteStatus> {
        self.sites.iter().find(|s| s.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SiteStatus> {
        self.sites.iter()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Number of sites currently green
    pub fn green_count(&self) -> usize {
        self.sites.iter().filter(|s| s.state.is_green()).count()
    }
}

impl<'a> Index<&'a str> for SignalStates {
    type Output = SignalState;

    /// Panics if `name` is not a registered site
    fn index(&self, name: &'a str) -> &SignalState {
        match self.status(name) {
            Some(status) => &status.state,
            None => panic!("no signal site named {:?}", name),
        }
    }
}

impl<'a> IntoIterator for &'a SignalStates {
    type Item = &'a SiteStatus;
    type IntoIter = std::slice::Iter<'a, SiteStatus>;

    fn into_iter(self) -> Self::IntoIter {
        self.sites.iter()
    }
}

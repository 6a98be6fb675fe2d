//! Cache generation lifecycle and request routing.
//!
//! A generation moves `Installing -> Ready -> Superseded`. A failed install
//! ends the lifecycle without ever reaching `Ready`, and a superseded
//! generation has already been deleted in full.
//!
//! Request handling is split into two decisions: where to look first
//! ([`Route`]) and what to do with a network response ([`Disposition`]).

use shutter_core::{Error, ResponseType};

/// Lifecycle state of one cache generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    /// Assets are being fetched; nothing is visible yet.
    Installing,
    /// Every asset is stored; eligible to serve once activated.
    Ready,
    /// Deleted because another generation was activated.
    Superseded,
}

/// Something that happened to a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    InstallSucceeded,
    InstallFailed,
    Superseded,
}

/// Result of applying an event: the next state, or the lifecycle ending
/// with the generation absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Next(GenerationState),
    Absent,
}

impl GenerationState {
    /// Apply `event`, rejecting transitions the lifecycle doesn't allow.
    pub fn apply(self, event: LifecycleEvent) -> Result<Transition, Error> {
        match (self, event) {
            (GenerationState::Installing, LifecycleEvent::InstallSucceeded) => {
                Ok(Transition::Next(GenerationState::Ready))
            }
            (GenerationState::Installing, LifecycleEvent::InstallFailed) => Ok(Transition::Absent),
            (GenerationState::Ready, LifecycleEvent::Superseded) => Ok(Transition::Next(GenerationState::Superseded)),
            (state, event) => Err(Error::InvalidTransition(format!("{event:?} while {state:?}"))),
        }
    }
}

/// Where an intercepted request is answered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Look in the named generation first, then the network.
    CacheFirst { generation: String },
    /// Go straight to the network and never store the result.
    NetworkOnly,
}

impl Route {
    /// Decide the route for a request.
    ///
    /// Without an active generation nothing is intercepted; non-`GET`
    /// requests are never matched against the cache.
    pub fn select(current: Option<&str>, cacheable_method: bool) -> Self {
        match current {
            Some(generation) if cacheable_method => Route::CacheFirst { generation: generation.to_string() },
            _ => Route::NetworkOnly,
        }
    }
}

/// What to do with a network response on a cache-first miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Store a copy in the current generation, then return it.
    Store,
    /// Return it untouched.
    PassThrough,
}

impl Disposition {
    /// Only `200` same-origin (`basic`) responses are stored.
    pub fn for_response(status: u16, response_type: ResponseType) -> Self {
        if status == 200 && response_type == ResponseType::Basic {
            Disposition::Store
        } else {
            Disposition::PassThrough
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_success_reaches_ready() {
        let next = GenerationState::Installing.apply(LifecycleEvent::InstallSucceeded).unwrap();
        assert_eq!(next, Transition::Next(GenerationState::Ready));
    }

    #[test]
    fn test_install_failure_leaves_absent() {
        let next = GenerationState::Installing.apply(LifecycleEvent::InstallFailed).unwrap();
        assert_eq!(next, Transition::Absent);
    }

    #[test]
    fn test_ready_superseded() {
        let next = GenerationState::Ready.apply(LifecycleEvent::Superseded).unwrap();
        assert_eq!(next, Transition::Next(GenerationState::Superseded));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(GenerationState::Installing.apply(LifecycleEvent::Superseded).is_err());
        assert!(GenerationState::Ready.apply(LifecycleEvent::InstallSucceeded).is_err());
        assert!(GenerationState::Superseded.apply(LifecycleEvent::Superseded).is_err());
        assert!(GenerationState::Superseded.apply(LifecycleEvent::InstallSucceeded).is_err());
    }

    #[test]
    fn test_route_selection() {
        assert_eq!(Route::select(Some("v1"), true), Route::CacheFirst { generation: "v1".into() });
        assert_eq!(Route::select(Some("v1"), false), Route::NetworkOnly);
        assert_eq!(Route::select(None, true), Route::NetworkOnly);
    }

    #[test]
    fn test_disposition() {
        assert_eq!(Disposition::for_response(200, ResponseType::Basic), Disposition::Store);
        assert_eq!(Disposition::for_response(200, ResponseType::Cors), Disposition::PassThrough);
        assert_eq!(Disposition::for_response(404, ResponseType::Basic), Disposition::PassThrough);
        assert_eq!(Disposition::for_response(204, ResponseType::Basic), Disposition::PassThrough);
    }
}

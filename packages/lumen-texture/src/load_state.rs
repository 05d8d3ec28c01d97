//! Texture load state machine

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadState {
    #[default]
    NotStarted,
    Loading,
    LoadFinished,
    WaitingForMask,
    MaskApplying,
    MaskApplied,
    Uploaded,
    /// Removed while loading, the result will be discarded
    Cancelled,
    /// Removed while the mask was being applied
    MaskCancelled,
    LoadFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadEvent {
    StartLoad,
    Finish,
    WaitForMask,
    StartMaskApply,
    MaskApplied,
    Upload,
    Fail,
    Release,
    Resume,
    ForceReload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid load state transition {event:?} from {from:?}")]
pub struct TransitionError {
    pub from: LoadState,
    pub event: LoadEvent,
}

impl LoadState {
    /// Loading has started and the texture is not uploaded yet
    #[inline]
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            LoadState::Loading
                | LoadState::WaitingForMask
                | LoadState::MaskApplying
                | LoadState::MaskApplied
                | LoadState::Cancelled
                | LoadState::MaskCancelled
        )
    }

    pub fn is_cancelled(self) -> bool {
        matches!(self, LoadState::Cancelled | LoadState::MaskCancelled)
    }

    pub fn transition(self, event: LoadEvent) -> Result<LoadState, TransitionError> {
        use LoadEvent as E;
        use LoadState as S;

        let next = match (self, event) {
            (S::NotStarted | S::LoadFailed | S::LoadFinished, E::StartLoad) => S::Loading,
            (S::Loading, E::Finish) => S::LoadFinished,
            (S::Loading, E::WaitForMask) => S::WaitingForMask,
            (S::Loading | S::WaitingForMask, E::StartMaskApply) => S::MaskApplying,
            (S::MaskApplying, E::MaskApplied) => S::MaskApplied,
            (S::Cancelled | S::MaskCancelled | S::MaskApplying, E::Upload) => {
                return Err(TransitionError { from: self, event });
            }
            (_, E::Upload) => S::Uploaded,
            (S::NotStarted | S::Loading | S::WaitingForMask | S::MaskApplying, E::Fail) => {
                S::LoadFailed
            }
            (S::Loading, E::Release) => S::Cancelled,
            (S::MaskApplying, E::Release) => S::MaskCancelled,
            (S::Cancelled, E::Resume) => S::Loading,
            (S::MaskCancelled, E::Resume) => S::MaskApplying,
            (state, E::ForceReload) if !state.is_in_flight() => S::NotStarted,
            _ => return Err(TransitionError { from: self, event }),
        };
        Ok(next)
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_load_reaches_uploaded() {
        let state = LoadState::NotStarted
            .transition(LoadEvent::StartLoad)
            .and_then(|s| s.transition(LoadEvent::Finish))
            .and_then(|s| s.transition(LoadEvent::Upload))
            .unwrap();
        assert_eq!(state, LoadState::Uploaded);
    }

    #[test]
    fn release_and_resume_while_loading() {
        let cancelled = LoadState::Loading.transition(LoadEvent::Release).unwrap();
        assert_eq!(cancelled, LoadState::Cancelled);
        assert_eq!(cancelled.transition(LoadEvent::Resume).unwrap(), LoadState::Loading);

        let mask_cancelled = LoadState::MaskApplying.transition(LoadEvent::Release).unwrap();
        assert_eq!(
            mask_cancelled.transition(LoadEvent::Resume).unwrap(),
            LoadState::MaskApplying
        );
    }

    #[test]
    fn cancelled_texture_is_never_uploaded() {
        assert!(LoadState::Cancelled.transition(LoadEvent::Upload).is_err());
        assert!(LoadState::Uploaded.transition(LoadEvent::Finish).is_err());
    }

    #[test]
    fn forced_reload_only_when_idle() {
        assert_eq!(
            LoadState::Uploaded.transition(LoadEvent::ForceReload).unwrap(),
            LoadState::NotStarted
        );
        assert!(LoadState::Loading.transition(LoadEvent::ForceReload).is_err());
        assert!(LoadState::WaitingForMask.transition(LoadEvent::ForceReload).is_err());
    }
}

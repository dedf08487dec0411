use std::collections::BTreeSet;
use std::fmt;

/// Gateway session lifecycle, driven only by gateway callbacks
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connected,
    ShardsReady(BTreeSet<u64>),
    Ready,
}

/// Lifecycle signals the gateway reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleSignal {
    Connect,
    ShardReady(u64),
    Ready,
    Disconnect,
}

impl SessionState {
    /// Next state after `signal`. Returns `None` when the signal is out of order,
    /// in which case the caller keeps the current state.
    pub fn transition(&self, signal: LifecycleSignal) -> Option<SessionState> {
        use LifecycleSignal::*;
        match (self, signal) {
            (_, Disconnect) => Some(SessionState::Disconnected),
            (SessionState::Disconnected, Connect) => Some(SessionState::Connected),
            (SessionState::Connected, ShardReady(id)) => {
                Some(SessionState::ShardsReady(BTreeSet::from([id])))
            }
            (SessionState::ShardsReady(shards), ShardReady(id)) => {
                let mut shards = shards.clone();
                shards.insert(id);
                Some(SessionState::ShardsReady(shards))
            }
            (SessionState::Connected | SessionState::ShardsReady(_), Ready) => {
                Some(SessionState::Ready)
            }
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SessionState::Ready)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Disconnected => write!(f, "offline"),
            SessionState::Connected => write!(f, "connecting"),
            SessionState::ShardsReady(shards) => write!(f, "starting ({} shards)", shards.len()),
            SessionState::Ready => write!(f, "online"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleSignal::*;

    #[test]
    fn test_startup_sequence() {
        let state = SessionState::default();
        let state = state.transition(Connect).unwrap();
        let state = state.transition(ShardReady(0)).unwrap();
        let state = state.transition(ShardReady(1)).unwrap();
        assert_eq!(state, SessionState::ShardsReady(BTreeSet::from([0, 1])));
        let state = state.transition(Ready).unwrap();
        assert!(state.is_ready());
    }

    #[test]
    fn test_ready_is_terminal_until_disconnect() {
        let ready = SessionState::Ready;
        assert!(ready.transition(Connect).is_none());
        assert!(ready.transition(ShardReady(3)).is_none());
        assert_eq!(ready.transition(Disconnect), Some(SessionState::Disconnected));
    }

    #[test]
    fn test_ready_requires_connection() {
        assert!(SessionState::Disconnected.transition(Ready).is_none());
    }
}

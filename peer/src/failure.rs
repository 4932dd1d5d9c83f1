//! Heartbeat-timeout failure detection and eviction bookkeeping.

use crate::membership::Member;
use crate::session::{Effects, Session};
use log::{debug, warn};
use shared::PlayerId;
use std::time::{Duration, Instant};

impl Session {
    /// Evicts members that have been silent for longer than `threshold`.
    ///
    /// The leader watches everyone; a follower only watches the leader, since
    /// the leader's announcements tell it about everyone else.
    pub fn detect_failures(&mut self, now: Instant, threshold: Duration) -> Effects {
        let mut effects = Effects::default();
        if self.is_concluded() {
            return effects;
        }

        let local = self.local;
        let suspects: Vec<PlayerId> = if self.is_leader() {
            self.membership
                .iter()
                .filter(|member| member.id() != local && member.is_suspected(now, threshold))
                .map(Member::id)
                .collect()
        } else {
            self.membership
                .leader()
                .filter(|leader| leader.id() != local && leader.is_suspected(now, threshold))
                .map(|leader| vec![leader.id()])
                .unwrap_or_default()
        };

        for id in suspects {
            warn!("No word from {} for over {:?}, evicting", id, threshold);
            self.evict(id);
        }

        self.evaluate_outcome(&mut effects);
        effects
    }

    /// Forgets announced evictions once every other member reports a list
    /// without them.
    pub(crate) fn prune_evictions(&mut self) {
        let local = self.local;
        let membership = &self.membership;
        self.evicted.retain(|id| {
            let pending = membership
                .iter()
                .any(|member| member.id() != local && member.view.contains(id));
            if !pending {
                debug!("Eviction of {} acknowledged by everyone", id);
            }
            pending
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::session;
    use crate::session::Outcome;
    use shared::Message;

    const THRESHOLD: Duration = Duration::from_secs(7);

    #[test]
    fn test_quiet_session_evicts_nobody() {
        let start = Instant::now();
        let mut session = session(1, 3, start);
        session.detect_failures(start + THRESHOLD, THRESHOLD);
        assert_eq!(session.membership().len(), 3);
    }

    #[test]
    fn test_leader_evicts_silent_follower() {
        let start = Instant::now();
        let mut session = session(1, 3, start);
        let later = start + Duration::from_secs(8);
        session.membership.touch(PlayerId(3), later);

        session.detect_failures(later, THRESHOLD);

        assert_eq!(session.membership().ids(), vec![PlayerId(1), PlayerId(3)]);
        assert_eq!(session.evicted(), &[PlayerId(2)]);
        match session.routine_update() {
            Some(Message::LeaderUpdate { evicted, .. }) => assert_eq!(evicted, vec![PlayerId(2)]),
            other => panic!("expected leader update, got {:?}", other),
        }
    }

    #[test]
    fn test_follower_only_watches_the_leader() {
        let start = Instant::now();
        let mut session = session(3, 3, start);
        let later = start + Duration::from_secs(8);
        session.membership.touch(PlayerId(1), later);

        // p2 is silent too, but that is the leader's call.
        session.detect_failures(later, THRESHOLD);
        assert_eq!(session.membership().len(), 3);
    }

    #[test]
    fn test_follower_evicts_silent_leader() {
        let start = Instant::now();
        let mut session = session(2, 3, start);
        let later = start + Duration::from_secs(8);
        session.membership.touch(PlayerId(3), later);

        session.detect_failures(later, THRESHOLD);

        assert!(session.is_leader());
        assert_eq!(session.membership().ids(), vec![PlayerId(2), PlayerId(3)]);
        assert!(matches!(
            session.routine_update(),
            Some(Message::LeaderUpdate { .. })
        ));
    }

    #[test]
    fn test_last_member_standing_wins_by_eviction() {
        let start = Instant::now();
        let mut session = session(2, 2, start);

        let effects = session.detect_failures(start + Duration::from_secs(8), THRESHOLD);

        assert_eq!(session.outcome(), Some(Outcome::Winner(PlayerId(2))));
        assert!(!effects.events.is_empty());
    }

    #[test]
    fn test_evictions_pruned_once_acknowledged() {
        let start = Instant::now();
        let mut session = session(1, 3, start);
        session.evict(PlayerId(2));

        session.prune_evictions();
        assert_eq!(session.evicted(), &[PlayerId(2)]);

        session
            .membership
            .record_view(PlayerId(3), vec![PlayerId(1), PlayerId(3)]);
        session.prune_evictions();
        assert!(session.evicted().is_empty());
    }
}

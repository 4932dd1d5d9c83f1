//! Ordered membership list for a running session
//!
//! The list is seeded once from the matchmaking roster and afterwards only
//! shrinks. Its order never changes, which makes it the leader-election rule:
//! whoever survives at index 0 is the leader. No election round is needed,
//! every peer derives the same answer from the same list.
//!
//! Besides the player state itself each entry tracks when we last heard from
//! the peer (for failure detection) and the membership view it last reported
//! (for pruning announced evictions).

use log::info;
use shared::{Player, PlayerId};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// One participant as seen by the local peer
#[derive(Debug, Clone)]
pub struct Member {
    /// Latest known state of the player
    pub player: Player,
    /// Last time any message from this peer arrived
    pub last_seen: Instant,
    /// Member ids this peer listed in its latest update
    pub view: Vec<PlayerId>,
}

impl Member {
    pub fn new(player: Player, view: Vec<PlayerId>, now: Instant) -> Self {
        Self {
            player,
            last_seen: now,
            view,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.player.id
    }

    /// True when nothing has been heard from this peer for longer than
    /// `threshold` as of `now`.
    pub fn is_suspected(&self, now: Instant, threshold: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > threshold
    }
}

#[derive(Debug, Clone, Default)]
pub struct Membership {
    members: Vec<Member>,
}

impl Membership {
    /// Builds the list in join order. Every member starts with the full
    /// roster as its view, since that is what everyone is handed.
    pub fn from_players(players: Vec<Player>, now: Instant) -> Self {
        let roster: Vec<PlayerId> = players.iter().map(|player| player.id).collect();
        let members = players
            .into_iter()
            .map(|player| Member::new(player, roster.clone(), now))
            .collect();
        Self { members }
    }

    /// The current leader: the first surviving entry.
    pub fn leader(&self) -> Option<&Member> {
        self.members.first()
    }

    pub fn is_leader(&self, id: PlayerId) -> bool {
        self.leader().map_or(false, |leader| leader.id() == id)
    }

    pub fn get(&self, id: PlayerId) -> Option<&Member> {
        self.members.iter().find(|member| member.id() == id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Member> {
        self.members.iter_mut().find(|member| member.id() == id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.get(id).is_some()
    }

    pub fn position(&self, id: PlayerId) -> Option<usize> {
        self.members.iter().position(|member| member.id() == id)
    }

    /// Removes a member, returning it if it was present. Removing index 0
    /// hands leadership to the next entry.
    pub fn remove(&mut self, id: PlayerId) -> Option<Member> {
        let index = self.position(id)?;
        let member = self.members.remove(index);
        info!("Member {} removed ({} remaining)", id, self.members.len());
        Some(member)
    }

    /// Refreshes the last-seen time of a member. Returns false for ids that
    /// are not (or no longer) members.
    pub fn touch(&mut self, id: PlayerId, now: Instant) -> bool {
        match self.get_mut(id) {
            Some(member) => {
                member.last_seen = now;
                true
            }
            None => false,
        }
    }

    pub fn record_view(&mut self, id: PlayerId, view: Vec<PlayerId>) {
        if let Some(member) = self.get_mut(id) {
            member.view = view;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Member> {
        self.members.iter()
    }

    pub fn ids(&self) -> Vec<PlayerId> {
        self.members.iter().map(Member::id).collect()
    }

    /// Members that are still alive, in list order.
    pub fn alive_ids(&self) -> Vec<PlayerId> {
        self.members
            .iter()
            .filter(|member| member.player.alive)
            .map(Member::id)
            .collect()
    }

    pub fn alive_count(&self) -> usize {
        self.members
            .iter()
            .filter(|member| member.player.alive)
            .count()
    }

    /// Addresses of every member except `local`.
    pub fn peer_addrs(&self, local: PlayerId) -> Vec<SocketAddr> {
        self.members
            .iter()
            .filter(|member| member.id() != local)
            .map(|member| member.player.addr)
            .collect()
    }

    /// Members ahead of `id` in the list, i.e. everyone who would have to be
    /// gone for `id` to lead.
    pub fn ahead_of(&self, id: PlayerId) -> Vec<PlayerId> {
        self.members
            .iter()
            .map(Member::id)
            .take_while(|member| *member != id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(slot: u8) -> Player {
        let addr: SocketAddr = format!("127.0.0.1:{}", 9000 + slot as u16).parse().unwrap();
        Player::spawn(PlayerId(slot), addr).unwrap()
    }

    fn three_members(now: Instant) -> Membership {
        Membership::from_players(vec![player(1), player(2), player(3)], now)
    }

    #[test]
    fn test_leader_is_first_entry() {
        let membership = three_members(Instant::now());
        assert_eq!(membership.leader().unwrap().id(), PlayerId(1));
        assert!(membership.is_leader(PlayerId(1)));
        assert!(!membership.is_leader(PlayerId(2)));
    }

    #[test]
    fn test_removing_leader_promotes_next() {
        let mut membership = three_members(Instant::now());

        let removed = membership.remove(PlayerId(1)).unwrap();
        assert_eq!(removed.id(), PlayerId(1));
        assert!(membership.is_leader(PlayerId(2)));
        assert_eq!(membership.len(), 2);
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut membership = three_members(Instant::now());
        assert!(membership.remove(PlayerId(5)).is_none());
        assert_eq!(membership.len(), 3);
    }

    #[test]
    fn test_removal_never_reorders() {
        let mut membership = three_members(Instant::now());
        membership.remove(PlayerId(2));
        assert_eq!(membership.ids(), vec![PlayerId(1), PlayerId(3)]);
    }

    #[test]
    fn test_empty_list_has_no_leader() {
        let membership = Membership::default();
        assert!(membership.leader().is_none());
        assert!(!membership.is_leader(PlayerId(1)));
        assert!(membership.is_empty());
    }

    #[test]
    fn test_touch_known_and_unknown() {
        let start = Instant::now();
        let mut membership = three_members(start);
        let later = start + Duration::from_secs(3);

        assert!(membership.touch(PlayerId(2), later));
        assert_eq!(membership.get(PlayerId(2)).unwrap().last_seen, later);
        assert!(!membership.touch(PlayerId(6), later));
    }

    #[test]
    fn test_suspicion_threshold() {
        let start = Instant::now();
        let membership = three_members(start);
        let member = membership.get(PlayerId(2)).unwrap();
        let threshold = Duration::from_secs(7);

        assert!(!member.is_suspected(start + Duration::from_secs(7), threshold));
        assert!(member.is_suspected(start + Duration::from_secs(8), threshold));
    }

    #[test]
    fn test_peer_addrs_excludes_local() {
        let membership = three_members(Instant::now());
        let addrs = membership.peer_addrs(PlayerId(2));
        assert_eq!(addrs.len(), 2);
        assert!(!addrs.contains(&player(2).addr));
    }

    #[test]
    fn test_alive_count_and_views() {
        let mut membership = three_members(Instant::now());
        assert_eq!(membership.alive_count(), 3);
        assert_eq!(
            membership.get(PlayerId(3)).unwrap().view,
            vec![PlayerId(1), PlayerId(2), PlayerId(3)]
        );

        membership.get_mut(PlayerId(1)).unwrap().player.alive = false;
        assert_eq!(membership.alive_count(), 2);
        assert_eq!(membership.alive_ids(), vec![PlayerId(2), PlayerId(3)]);

        membership.record_view(PlayerId(3), vec![PlayerId(1), PlayerId(3)]);
        assert_eq!(
            membership.get(PlayerId(3)).unwrap().view,
            vec![PlayerId(1), PlayerId(3)]
        );
    }

    #[test]
    fn test_leader_is_smallest_surviving_slot() {
        let players: Vec<Player> = (1..=6).map(player).collect();
        // Every subset of removals, encoded as a bitmask.
        for mask in 0u8..63 {
            let mut membership = Membership::from_players(players.clone(), Instant::now());
            for slot in 1..=6u8 {
                if mask & (1 << (slot - 1)) != 0 {
                    membership.remove(PlayerId(slot));
                }
            }
            let expected = (1..=6u8).find(|slot| mask & (1 << (slot - 1)) == 0);
            assert_eq!(membership.leader().map(Member::id), expected.map(PlayerId));
        }
    }

    #[test]
    fn test_ahead_of() {
        let membership = three_members(Instant::now());
        assert_eq!(membership.ahead_of(PlayerId(3)), vec![PlayerId(1), PlayerId(2)]);
        assert!(membership.ahead_of(PlayerId(1)).is_empty());
    }
}

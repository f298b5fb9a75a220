//! First-touch user profiles built from the visits log.

use chrono::NaiveDateTime;
use cohort_core::types::{Profile, Session, UserId};
use std::collections::btree_map;
use std::collections::BTreeMap;
use tracing::debug;

/// One profile per distinct user in the visits log, ordered by user id.
#[derive(Debug, Clone, Default)]
pub struct ProfileSet {
    profiles: BTreeMap<UserId, Profile>,
}

impl ProfileSet {
    /// Build profiles from sessions.
    ///
    /// The first touch is the session with the smallest `(session_start, row
    /// position)`, so among sessions starting at the same instant the one
    /// that appears earliest in the input wins. The result does not depend on
    /// whether the input is time-sorted.
    pub fn build(sessions: &[Session]) -> Self {
        let mut first: BTreeMap<UserId, (NaiveDateTime, usize)> = BTreeMap::new();
        for (seq, session) in sessions.iter().enumerate() {
            match first.entry(session.user_id) {
                btree_map::Entry::Vacant(slot) => {
                    slot.insert((session.session_start, seq));
                }
                btree_map::Entry::Occupied(mut slot) => {
                    // Rows are visited in increasing seq, so only a strictly
                    // earlier start can displace the current first touch.
                    if session.session_start < slot.get().0 {
                        slot.insert((session.session_start, seq));
                    }
                }
            }
        }

        let profiles: BTreeMap<UserId, Profile> = first
            .into_iter()
            .map(|(user_id, (first_touch_ts, seq))| {
                let session = &sessions[seq];
                (
                    user_id,
                    Profile {
                        user_id,
                        first_touch_ts,
                        first_channel: session.channel.clone(),
                        region: session.region.clone(),
                        device: session.device.clone(),
                    },
                )
            })
            .collect();

        debug!(profiles = profiles.len(), sessions = sessions.len(), "Profiles built");
        Self { profiles }
    }

    pub fn get(&self, user_id: UserId) -> Option<&Profile> {
        self.profiles.get(&user_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Latest first-touch timestamp among all profiles.
    pub fn last_join(&self) -> Option<NaiveDateTime> {
        self.iter().map(|p| p.first_touch_ts).max()
    }
}

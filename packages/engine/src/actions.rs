use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::{
    error::Rejection,
    models::{
        ActionAttempt, ActionKind, ActionResult, Applied, EventKind, PendingAction, PlayerAction,
        RawAction, Vote,
    },
    state::GameState,
};

impl GameState {
    /// Validates `action` against the server clock and records it if legal.
    pub fn process_action(&mut self, action: &PlayerAction) -> ActionResult {
        self.process_action_at(action, Utc::now())
    }

    /// Validates and applies `action` with `now` as the server clock.
    ///
    /// Every call on a running game appends exactly one event, applied or
    /// rejected. A rejected action changes nothing else.
    pub fn process_action_at(&mut self, action: &PlayerAction, now: DateTime<Utc>) -> ActionResult {
        if self.is_finished() {
            return Err(Rejection::GameFinished);
        }

        match self.validate(action, now) {
            Ok(()) => {
                let applied = self.apply(action);
                debug!(
                    kind = %action.kind,
                    actor = %action.actor_id,
                    target = %action.target_id,
                    ?applied,
                    "action applied"
                );
                self.record(
                    now,
                    EventKind::ActionApplied {
                        action: action.clone(),
                        applied,
                    },
                );
                Ok(applied)
            }
            Err(reason) => {
                debug!(kind = %action.kind, actor = %action.actor_id, %reason, "action rejected");
                self.record(
                    now,
                    EventKind::ActionRejected {
                        attempt: ActionAttempt::from(action),
                        reason: reason.clone(),
                    },
                );
                Err(reason)
            }
        }
    }

    /// Entry point for untyped payloads. Conversion failures are rejected and
    /// audited exactly like any other invalid action.
    pub fn process_raw_action(&mut self, raw: RawAction) -> ActionResult {
        self.process_raw_action_at(raw, Utc::now())
    }

    pub fn process_raw_action_at(&mut self, raw: RawAction, now: DateTime<Utc>) -> ActionResult {
        if self.is_finished() {
            return Err(Rejection::GameFinished);
        }

        let attempt = ActionAttempt::from(&raw);
        match PlayerAction::try_from(raw) {
            Ok(action) => self.process_action_at(&action, now),
            Err(err) => {
                let reason = Rejection::from(err);
                debug!(%reason, "malformed action rejected");
                self.record(
                    now,
                    EventKind::ActionRejected {
                        attempt,
                        reason: reason.clone(),
                    },
                );
                Err(reason)
            }
        }
    }

    // 検証順序: 参加者 → 時刻 → 行為者生存 → 対象生存 → フェーズ → 役職
    fn validate(&self, action: &PlayerAction, now: DateTime<Utc>) -> Result<(), Rejection> {
        let actor = self
            .player(&action.actor_id)
            .ok_or_else(|| Rejection::UnknownPlayer {
                player_id: action.actor_id.clone(),
            })?;
        let target = self
            .player(&action.target_id)
            .ok_or_else(|| Rejection::UnknownPlayer {
                player_id: action.target_id.clone(),
            })?;

        if self.is_future(action.timestamp, now) {
            return Err(Rejection::FutureTimestamp);
        }
        if !actor.is_alive {
            return Err(Rejection::ActorDead {
                player_id: actor.id.clone(),
            });
        }
        if !target.is_alive {
            return Err(Rejection::TargetDead {
                player_id: target.id.clone(),
            });
        }
        if self.phase != action.kind.legal_phase() {
            return Err(Rejection::WrongPhase {
                action: action.kind,
                phase: self.phase,
            });
        }
        if !actor.role.can_perform(action.kind) {
            return Err(Rejection::RoleNotPermitted {
                role: actor.role,
                action: action.kind,
            });
        }

        let targeting = &self.settings.targeting;
        if action.is_self_targeted() && !targeting.allows_self(action.kind) {
            return Err(Rejection::SelfTargetNotAllowed {
                action: action.kind,
            });
        }
        if action.kind == ActionKind::Kill
            && !action.is_self_targeted()
            && target.role.is_antagonist()
            && !targeting.allow_mafia_target_mafia
        {
            return Err(Rejection::FriendlyTarget);
        }

        Ok(())
    }

    fn is_future(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        // サブミリ秒の先行も未来扱い
        let tolerance = Duration::try_milliseconds(
            i64::try_from(self.settings.max_clock_skew_ms).unwrap_or(i64::MAX),
        );
        match tolerance.and_then(|skew| now.checked_add_signed(skew)) {
            Some(latest) => timestamp > latest,
            None => false,
        }
    }

    fn apply(&mut self, action: &PlayerAction) -> Applied {
        match action.kind {
            ActionKind::Vote => self.apply_vote(action),
            ActionKind::Heal | ActionKind::Investigate | ActionKind::Protect | ActionKind::Kill => {
                self.apply_night_action(action)
            }
        }
    }

    fn apply_vote(&mut self, action: &PlayerAction) -> Applied {
        let previous = self
            .votes
            .iter()
            .rev()
            .find(|v| v.voter_id == action.actor_id)
            .map(|v| v.target_id.as_str());

        let applied = match previous {
            Some(target) if target == action.target_id => return Applied::Unchanged,
            Some(_) => Applied::Superseded,
            None => Applied::Recorded,
        };

        self.votes.push(Vote {
            voter_id: action.actor_id.clone(),
            target_id: action.target_id.clone(),
            cast_at: action.timestamp,
        });
        applied
    }

    // 同じ夜に再提出した場合は最新のものが有効
    fn apply_night_action(&mut self, action: &PlayerAction) -> Applied {
        let pending = PendingAction {
            kind: action.kind,
            target_id: action.target_id.clone(),
            submitted_at: action.timestamp,
        };

        let applied = match self.pending_actions.get(&action.actor_id) {
            Some(current) if current.kind == pending.kind && current.target_id == pending.target_id => {
                return Applied::Unchanged;
            }
            Some(_) => Applied::Superseded,
            None => Applied::Recorded,
        };

        self.pending_actions.insert(action.actor_id.clone(), pending);
        applied
    }
}

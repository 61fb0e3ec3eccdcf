use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::{game::Phase, player::PlayerId};
use crate::error::{RawActionError, Rejection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Vote,
    Heal,
    Investigate,
    Protect,
    Kill,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Vote => "vote",
            ActionKind::Heal => "heal",
            ActionKind::Investigate => "investigate",
            ActionKind::Protect => "protect",
            ActionKind::Kill => "kill",
        }
    }

    /// The only phase in which this action may be submitted.
    pub fn legal_phase(self) -> Phase {
        match self {
            ActionKind::Vote => Phase::Voting,
            ActionKind::Heal | ActionKind::Investigate | ActionKind::Protect | ActionKind::Kill => {
                Phase::Night
            }
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = RawActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vote" => Ok(ActionKind::Vote),
            "heal" => Ok(ActionKind::Heal),
            "investigate" => Ok(ActionKind::Investigate),
            "protect" => Ok(ActionKind::Protect),
            "kill" => Ok(ActionKind::Kill),
            _ => Err(RawActionError::UnknownActionType {
                kind: s.to_string(),
            }),
        }
    }
}

/// A fully typed player action. Transports build one from a [`RawAction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub actor_id: PlayerId,
    pub target_id: PlayerId,
    pub timestamp: DateTime<Utc>,
}

impl PlayerAction {
    pub fn new(
        kind: ActionKind,
        actor_id: impl Into<PlayerId>,
        target_id: impl Into<PlayerId>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            actor_id: actor_id.into(),
            target_id: target_id.into(),
            timestamp,
        }
    }

    pub fn is_self_targeted(&self) -> bool {
        self.actor_id == self.target_id
    }
}

/// Action payload as it arrives off the wire, before any validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAction {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub actor_id: Option<String>,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl TryFrom<RawAction> for PlayerAction {
    type Error = RawActionError;

    fn try_from(raw: RawAction) -> Result<Self, Self::Error> {
        let kind = raw
            .kind
            .ok_or_else(|| RawActionError::missing("type"))?
            .parse::<ActionKind>()?;
        let actor_id = non_empty(raw.actor_id).ok_or_else(|| RawActionError::missing("actor_id"))?;
        let target_id =
            non_empty(raw.target_id).ok_or_else(|| RawActionError::missing("target_id"))?;
        let timestamp = raw
            .timestamp
            .ok_or_else(|| RawActionError::missing("timestamp"))?;
        let timestamp = DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|_| RawActionError::InvalidTimestamp { value: timestamp.clone() })?
            .with_timezone(&Utc);

        Ok(PlayerAction {
            kind,
            actor_id,
            target_id,
            timestamp,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Who tried what, as far as it could be made out. Recorded for rejected actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionAttempt {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub actor_id: Option<PlayerId>,
    pub target_id: Option<PlayerId>,
}

impl From<&PlayerAction> for ActionAttempt {
    fn from(action: &PlayerAction) -> Self {
        Self {
            kind: Some(action.kind.as_str().to_string()),
            actor_id: Some(action.actor_id.clone()),
            target_id: Some(action.target_id.clone()),
        }
    }
}

impl From<&RawAction> for ActionAttempt {
    fn from(raw: &RawAction) -> Self {
        Self {
            kind: raw.kind.clone(),
            actor_id: raw.actor_id.clone(),
            target_id: raw.target_id.clone(),
        }
    }
}

/// How an accepted action changed the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Applied {
    /// First submission from this actor in the current phase.
    Recorded,
    /// Replaced the actor's earlier submission.
    Superseded,
    /// Identical to the actor's current submission; nothing changed.
    Unchanged,
}

pub type ActionResult = Result<Applied, Rejection>;

/// Serializable form of an [`ActionResult`] for transports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied: Option<Applied>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
}

impl From<&ActionResult> for ActionOutcome {
    fn from(result: &ActionResult) -> Self {
        match result {
            Ok(applied) => ActionOutcome {
                success: true,
                applied: Some(*applied),
                reason: None,
                rejection: None,
            },
            Err(rejection) => ActionOutcome {
                success: false,
                applied: None,
                reason: Some(rejection.to_string()),
                rejection: Some(rejection.clone()),
            },
        }
    }
}

use std::time::Duration;

use chrono::{DateTime, Utc};
use game_engine::{
    ActionOutcome, EventKind, GameEvent, GameState, Phase, PhaseTransition, PlayerView, RawAction,
};
use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    time::{sleep_until, Instant},
};
use tracing::{debug, info, warn};

use crate::models::{
    config::ServerConfig,
    message::{ServerEvent, ServerPayload},
};

/// Requests a room's actor handles one at a time, in arrival order.
#[derive(Debug)]
pub enum RoomCommand {
    SubmitAction {
        action: RawAction,
        reply: oneshot::Sender<ActionOutcome>,
    },
    AdvancePhase {
        reply: oneshot::Sender<PhaseTransition>,
    },
    Snapshot {
        reply: oneshot::Sender<GameState>,
    },
    ViewFor {
        player_id: String,
        reply: oneshot::Sender<PlayerView>,
    },
    EndGame {
        reason: String,
        reply: oneshot::Sender<bool>,
    },
    PlayerConnected {
        player_id: String,
    },
    PlayerDisconnected {
        player_id: String,
    },
    Shutdown,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("room {room_id} is no longer running")]
pub struct RoomClosed {
    pub room_id: String,
}

/// Cloneable sender side of a room's command queue.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_id: String,
    tx: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Moves `state` into a new actor task and returns the handle to it.
    pub fn spawn(
        room_id: &str,
        state: GameState,
        events: broadcast::Sender<ServerEvent>,
        config: &ServerConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.room_queue_capacity);
        let actor = RoomActor {
            room_id: room_id.to_string(),
            state,
            rx,
            events,
            published: 0,
            auto_advance: config.auto_advance_phases,
            advance_when_ready: config.advance_when_ready,
            show_player_roles: config.show_player_roles,
            deadline: None,
        };
        tokio::spawn(actor.run());

        RoomHandle {
            room_id: room_id.to_string(),
            tx,
        }
    }

    pub async fn submit_action(&self, action: RawAction) -> Result<ActionOutcome, RoomClosed> {
        self.request(|reply| RoomCommand::SubmitAction { action, reply })
            .await
    }

    pub async fn advance_phase(&self) -> Result<PhaseTransition, RoomClosed> {
        self.request(|reply| RoomCommand::AdvancePhase { reply }).await
    }

    pub async fn snapshot(&self) -> Result<GameState, RoomClosed> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    pub async fn view_for(&self, player_id: &str) -> Result<PlayerView, RoomClosed> {
        let player_id = player_id.to_string();
        self.request(|reply| RoomCommand::ViewFor { player_id, reply })
            .await
    }

    pub async fn end_game(&self, reason: &str) -> Result<bool, RoomClosed> {
        let reason = reason.to_string();
        self.request(|reply| RoomCommand::EndGame { reason, reply })
            .await
    }

    pub async fn player_connected(&self, player_id: &str) -> Result<(), RoomClosed> {
        self.send(RoomCommand::PlayerConnected {
            player_id: player_id.to_string(),
        })
        .await
    }

    pub async fn player_disconnected(&self, player_id: &str) -> Result<(), RoomClosed> {
        self.send(RoomCommand::PlayerDisconnected {
            player_id: player_id.to_string(),
        })
        .await
    }

    pub async fn shutdown(&self) -> Result<(), RoomClosed> {
        self.send(RoomCommand::Shutdown).await
    }

    async fn send(&self, command: RoomCommand) -> Result<(), RoomClosed> {
        self.tx.send(command).await.map_err(|_| self.closed())
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomClosed> {
        let (reply, response) = oneshot::channel();
        self.send(make(reply)).await?;
        response.await.map_err(|_| self.closed())
    }

    fn closed(&self) -> RoomClosed {
        RoomClosed {
            room_id: self.room_id.clone(),
        }
    }
}

struct RoomActor {
    room_id: String,
    state: GameState,
    rx: mpsc::Receiver<RoomCommand>,
    events: broadcast::Sender<ServerEvent>,
    // 配信済みのエンジンイベント数
    published: usize,
    auto_advance: bool,
    advance_when_ready: bool,
    show_player_roles: bool,
    deadline: Option<Instant>,
}

impl RoomActor {
    async fn run(mut self) {
        info!("Room {} game actor started", self.room_id);
        if self.show_player_roles {
            for player in self.state.players() {
                debug!(room = %self.room_id, player = %player.id, role = %player.role, "role dealt");
            }
        }
        self.reset_deadline();
        self.publish_new_events();

        loop {
            let deadline = self.deadline;
            tokio::select! {
                command = self.rx.recv() => match command {
                    Some(RoomCommand::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                _ = wait_for(deadline) => {
                    debug!("Room {} phase timer fired", self.room_id);
                    self.advance();
                }
            }
        }

        info!("Room {} game actor stopped", self.room_id);
    }

    fn handle(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::SubmitAction { action, reply } => {
                let result = self.state.process_raw_action(action);
                let ready = result.is_ok() && self.state.ready_to_advance();
                self.publish_new_events();
                let _ = reply.send(ActionOutcome::from(&result));

                if ready && self.advance_when_ready {
                    debug!("Room {} has every action in, advancing early", self.room_id);
                    self.advance();
                }
            }
            RoomCommand::AdvancePhase { reply } => {
                let transition = self.advance();
                let _ = reply.send(transition);
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.state.clone());
            }
            RoomCommand::ViewFor { player_id, reply } => {
                let _ = reply.send(self.state.view_for(&player_id));
            }
            RoomCommand::EndGame { reason, reply } => {
                let ended = self.state.end_game(&reason);
                if ended {
                    self.deadline = None;
                    self.publish_new_events();
                }
                let _ = reply.send(ended);
            }
            RoomCommand::PlayerConnected { player_id } => {
                info!("Player {} connected to room {}", player_id, self.room_id);
                self.emit(ServerEvent::broadcast(
                    &self.room_id,
                    ServerPayload::PlayerConnected { player_id },
                ));
            }
            RoomCommand::PlayerDisconnected { player_id } => {
                info!("Player {} disconnected from room {}", player_id, self.room_id);
                self.emit(ServerEvent::broadcast(
                    &self.room_id,
                    ServerPayload::PlayerDisconnected { player_id },
                ));
            }
            // run() で処理済み
            RoomCommand::Shutdown => {}
        }
    }

    fn advance(&mut self) -> PhaseTransition {
        let transition = self.state.advance_phase();
        if !transition.is_noop() {
            self.reset_deadline();
            self.publish_new_events();
        }
        transition
    }

    fn reset_deadline(&mut self) {
        self.deadline = if self.auto_advance {
            self.state
                .settings()
                .phase_duration_ms(self.state.phase())
                .map(|ms| Instant::now() + Duration::from_millis(ms))
        } else {
            None
        };
    }

    fn ends_at(&self) -> Option<DateTime<Utc>> {
        let remaining = self.deadline?.checked_duration_since(Instant::now())?;
        chrono::Duration::from_std(remaining)
            .ok()
            .map(|d| Utc::now() + d)
    }

    /// Pushes engine events recorded since the last call. Private events
    /// only go to the player who caused them.
    fn publish_new_events(&mut self) {
        let fresh: Vec<GameEvent> = self.state.events()[self.published..].to_vec();
        self.published = self.state.events().len();

        for event in fresh {
            let outgoing = match &event.kind {
                EventKind::PhaseChanged { from, to } => ServerEvent::broadcast(
                    &self.room_id,
                    ServerPayload::PhaseChange {
                        from_phase: *from,
                        to_phase: *to,
                        day_number: event.day_number,
                        ends_at: self.ends_at(),
                    },
                ),
                EventKind::GameEnded { result } => ServerEvent::broadcast(
                    &self.room_id,
                    ServerPayload::GameEnded {
                        result: result.clone(),
                    },
                ),
                kind if kind.is_private() => match kind.actor() {
                    Some(actor) => ServerEvent::to_player(
                        &self.room_id,
                        actor,
                        ServerPayload::GameEvent {
                            event: event.clone(),
                        },
                    ),
                    None => continue,
                },
                _ => ServerEvent::broadcast(
                    &self.room_id,
                    ServerPayload::GameEvent {
                        event: event.clone(),
                    },
                ),
            };
            self.emit(outgoing);
        }

        if self.state.phase() == Phase::Finished {
            self.deadline = None;
        }
    }

    fn emit(&self, event: ServerEvent) {
        // 接続中のクライアントがいなくてもゲームは進む
        if self.events.send(event).is_err() {
            debug!("Room {} has no listeners", self.room_id);
        }
    }
}

impl Drop for RoomActor {
    fn drop(&mut self) {
        if !self.state.is_finished() {
            warn!("Room {} stopped before its game finished", self.room_id);
        }
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_engine::{Applied, GameSettings, Player, Role, RoleCount, WinningTeam};

    fn settings() -> GameSettings {
        GameSettings::with_roles(vec![
            RoleCount::new(Role::Mafia, 1),
            RoleCount::new(Role::Villager, 3),
        ])
    }

    fn table_with(settings: GameSettings) -> GameState {
        let players = (1..=4)
            .map(|i| Player::new(i.to_string(), format!("Player{}", i)))
            .collect();
        GameState::initialize(players, settings).unwrap()
    }

    fn table() -> GameState {
        table_with(settings())
    }

    fn spawn(config: ServerConfig) -> (RoomHandle, broadcast::Receiver<ServerEvent>) {
        let (tx, rx) = broadcast::channel(64);
        (RoomHandle::spawn("1", table(), tx, &config), rx)
    }

    fn raw(kind: &str, actor: &str, target: &str) -> RawAction {
        RawAction {
            kind: Some(kind.to_string()),
            actor_id: Some(actor.to_string()),
            target_id: Some(target.to_string()),
            timestamp: Some(Utc::now().to_rfc3339()),
        }
    }

    fn mafia_of(state: &GameState) -> String {
        state
            .players()
            .iter()
            .find(|p| p.role == Role::Mafia)
            .map(|p| p.id.clone())
            .unwrap()
    }

    #[tokio::test]
    async fn commands_are_applied_in_order() {
        let (handle, _rx) = spawn(ServerConfig::default());

        let transition = handle.advance_phase().await.unwrap();
        assert_eq!(transition.new, Phase::Voting);

        let first = handle.submit_action(raw("vote", "1", "2")).await.unwrap();
        let second = handle.submit_action(raw("vote", "1", "3")).await.unwrap();
        let again = handle.submit_action(raw("vote", "1", "3")).await.unwrap();
        assert_eq!(first.applied, Some(Applied::Recorded));
        assert_eq!(second.applied, Some(Applied::Superseded));
        assert_eq!(again.applied, Some(Applied::Unchanged));

        let state = handle.snapshot().await.unwrap();
        assert_eq!(state.active_votes().len(), 1);
        assert_eq!(state.active_votes()[0].target_id, "3");
    }

    #[tokio::test]
    async fn rejections_come_back_as_outcomes() {
        let (handle, _rx) = spawn(ServerConfig::default());

        // 昼に投票はできない
        let outcome = handle.submit_action(raw("vote", "1", "2")).await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.reason.unwrap().contains("phase"));

        let outcome = handle.submit_action(RawAction::default()).await.unwrap();
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn concurrent_votes_are_all_counted() {
        let (handle, _rx) = spawn(ServerConfig::default());
        handle.advance_phase().await.unwrap();

        let mut tasks = Vec::new();
        for voter in ["1", "2", "3", "4"] {
            let handle = handle.clone();
            let target = if voter == "4" { "3" } else { "4" };
            tasks.push(tokio::spawn(async move {
                handle.submit_action(raw("vote", voter, target)).await
            }));
        }
        for task in tasks {
            assert!(task.await.unwrap().unwrap().success);
        }

        let state = handle.snapshot().await.unwrap();
        assert_eq!(state.active_votes().len(), 4);
        assert_eq!(state.tally_votes().eliminated_player.as_deref(), Some("4"));
    }

    #[tokio::test]
    async fn phase_changes_are_broadcast() {
        let (handle, mut rx) = spawn(ServerConfig::default());
        handle.advance_phase().await.unwrap();

        let mut saw_phase_change = false;
        while let Ok(event) = rx.try_recv() {
            if let ServerPayload::PhaseChange {
                from_phase,
                to_phase,
                ..
            } = event.payload
            {
                assert_eq!(from_phase, Phase::Day);
                assert_eq!(to_phase, Phase::Voting);
                saw_phase_change = true;
            }
        }
        assert!(saw_phase_change);
    }

    #[tokio::test]
    async fn night_actions_are_only_sent_to_their_actor() {
        let (handle, mut rx) = spawn(ServerConfig::default());
        let mafia = mafia_of(&handle.snapshot().await.unwrap());
        let victim = if mafia == "1" { "2" } else { "1" };
        handle.advance_phase().await.unwrap();
        handle.advance_phase().await.unwrap();
        while rx.try_recv().is_ok() {}

        let outcome = handle.submit_action(raw("kill", &mafia, victim)).await.unwrap();
        assert!(outcome.success);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.target_player_id.as_deref(), Some(mafia.as_str()));
    }

    #[tokio::test]
    async fn advances_early_once_everyone_has_voted() {
        let config = ServerConfig {
            advance_when_ready: true,
            ..ServerConfig::default()
        };
        let (handle, _rx) = spawn(config);
        handle.advance_phase().await.unwrap();

        for voter in ["1", "2", "3"] {
            handle.submit_action(raw("vote", voter, "4")).await.unwrap();
        }
        assert_eq!(handle.snapshot().await.unwrap().phase(), Phase::Voting);
        handle.submit_action(raw("vote", "4", "1")).await.unwrap();

        let state = handle.snapshot().await.unwrap();
        assert_ne!(state.phase(), Phase::Voting);
        assert!(!state.is_alive("4"));
    }

    #[tokio::test]
    async fn timer_advances_the_phase() {
        let (tx, mut rx) = broadcast::channel(64);
        let state = table_with(GameSettings {
            day_phase_duration_ms: 20,
            ..settings()
        });

        let config = ServerConfig {
            auto_advance_phases: true,
            ..ServerConfig::default()
        };
        let handle = RoomHandle::spawn("1", state, tx, &config);

        let changed = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match rx.recv().await {
                    Ok(ServerEvent {
                        payload: ServerPayload::PhaseChange { to_phase, ends_at, .. },
                        ..
                    }) => break (to_phase, ends_at),
                    Ok(_) => continue,
                    Err(e) => panic!("channel closed: {:?}", e),
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(changed.0, Phase::Voting);
        assert!(changed.1.is_some());
        assert_eq!(handle.snapshot().await.unwrap().phase(), Phase::Voting);
    }

    #[tokio::test]
    async fn end_game_freezes_and_shutdown_closes() {
        let (handle, _rx) = spawn(ServerConfig::default());

        assert!(handle.end_game("host left").await.unwrap());
        assert!(!handle.end_game("again").await.unwrap());
        let state = handle.snapshot().await.unwrap();
        assert_eq!(
            state.win_result().unwrap().winning_team,
            WinningTeam::Draw
        );
        assert!(handle.advance_phase().await.unwrap().is_noop());

        handle.shutdown().await.unwrap();
        let err = handle.snapshot().await.unwrap_err();
        assert_eq!(err.room_id, "1");
    }
}

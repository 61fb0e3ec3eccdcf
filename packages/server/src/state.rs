use std::{collections::HashMap, sync::Arc};
use tokio::sync::{broadcast, Mutex};

use crate::models::{config::ServerConfig, message::ServerEvent, room::Room};
use crate::services::room_actor::RoomHandle;

#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<Mutex<HashMap<String, Room>>>,
    // 進行中のゲームはルームごとのアクターが所有する
    pub games: Arc<Mutex<HashMap<String, RoomHandle>>>,
    pub channel: Arc<Mutex<HashMap<String, broadcast::Sender<ServerEvent>>>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        AppState {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            games: Arc::new(Mutex::new(HashMap::new())),
            channel: Arc::new(Mutex::new(HashMap::new())),
            config: Arc::new(config),
        }
    }

    pub async fn get_or_create_room_channel(&self, room_id: &str) -> broadcast::Sender<ServerEvent> {
        let mut channels = self.channel.lock().await;
        if let Some(channel) = channels.get(room_id) {
            channel.clone()
        } else {
            let (tx, _) = broadcast::channel(self.config.broadcast_capacity);
            channels.insert(room_id.to_string(), tx.clone());
            tx
        }
    }

    pub async fn game_handle(&self, room_id: &str) -> Option<RoomHandle> {
        self.games.lock().await.get(room_id).cloned()
    }

    pub async fn remove_room_channel(&self, room_id: &str) {
        self.channel.lock().await.remove(room_id);
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

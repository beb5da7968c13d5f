use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use chrono::FixedOffset;
use teloxide::types::ChatId;
use tokio::sync::RwLock;

use crate::catalog::ProductKey;
use crate::database::Database;
use crate::entities::EntityCache;

/// Runtime configuration, read once at startup from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    /// Telegram ids allowed to manage operators.
    pub admin_tg_ids: Vec<i64>,
    /// Bank details shown to the customer in the payment instruction.
    pub payment_details: String,
    /// Customers and operators live in one timezone; meeting times are
    /// entered and displayed in it.
    pub client_utc_offset: FixedOffset,
}

impl Config {
    pub fn from_env() -> Result<Config, Box<dyn std::error::Error + Send + Sync>> {
        let database_url = env::var("DATABASE_URL")?;
        let admin_tg_ids = env::var("ADMIN_TG_IDS")
            .unwrap_or_default()
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim().parse::<i64>())
            .collect::<Result<Vec<i64>, _>>()?;
        let payment_details =
            env::var("PAYMENT_DETAILS").unwrap_or_else(|_| "Реквизиты уточняйте у оператора".to_string());
        let offset_hours: i32 = env::var("CLIENT_UTC_OFFSET_HOURS")
            .map(|s| s.parse())
            .unwrap_or(Ok(8))?;
        let client_utc_offset = FixedOffset::east_opt(offset_hours * 3600)
            .ok_or("CLIENT_UTC_OFFSET_HOURS out of range")?;

        Ok(Config {
            database_url,
            admin_tg_ids,
            payment_details,
            client_utc_offset,
        })
    }
}

/// What the bot is waiting for from a chat. Lost on restart; customers
/// restart an interrupted step by pressing the product button again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatState {
    Idle,
    /// Product chosen, waiting for the name the service is for.
    AwaitingCustomerName { kind: ProductKey },
    /// Payment instruction sent, waiting for the transfer screenshot.
    AwaitingPaymentPhoto { service_id: i64 },
    /// Walking the intake form; `index` is the field being asked.
    FillingForm {
        service_id: i64,
        kind: ProductKey,
        index: usize,
    },
    AwaitingPassport { service_id: i64, kind: ProductKey },
    AwaitingVisa { service_id: i64 },
}

/// Shared dependencies of every handler.
pub struct AppContext {
    pub db: Database,
    pub cache: EntityCache,
    pub config: Config,
    chat_states: RwLock<HashMap<ChatId, ChatState>>,
}

impl AppContext {
    pub fn new(db: Database, config: Config) -> Arc<AppContext> {
        let cache = EntityCache::new(db.pool.clone());
        Arc::new(AppContext {
            db,
            cache,
            config,
            chat_states: RwLock::new(HashMap::new()),
        })
    }

    pub fn is_admin(&self, tg_id: i64) -> bool {
        self.config.admin_tg_ids.contains(&tg_id)
    }

    pub async fn chat_state(&self, chat_id: ChatId) -> ChatState {
        self.chat_states
            .read()
            .await
            .get(&chat_id)
            .cloned()
            .unwrap_or(ChatState::Idle)
    }

    pub async fn set_chat_state(&self, chat_id: ChatId, state: ChatState) {
        log::debug!("chat {}: state -> {:?}", chat_id, state);
        self.chat_states.write().await.insert(chat_id, state);
    }

    pub async fn clear_chat_state(&self, chat_id: ChatId) {
        self.chat_states.write().await.remove(&chat_id);
    }
}

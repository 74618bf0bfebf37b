use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use gossip_core::{
    audit::AuditLogger,
    config::Config,
    confessions::ConfessionService,
    formatting::panel_html,
    messaging::{port::MessagingPort, timeout::TimeoutMessenger},
    store::RecordStore,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub service: Arc<ConfessionService>,
    pub messenger: Arc<dyn MessagingPort>,
}

pub async fn run_polling(cfg: Arc<Config>, store: Arc<RecordStore>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    // Basic startup info.
    if let Ok(me) = bot.get_me().await {
        tracing::info!(username = %me.username(), "gossip bot started");
    }
    tracing::info!(
        public_chat = cfg.gossip_chat_id.0,
        log_chat = cfg.log_chat_id.0,
        moderation = cfg.moderation_chat_id.is_some(),
        store = %store.path().display(),
        "configuration loaded"
    );

    // Every platform call is bounded; a hung request surfaces as a retryable timeout.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> =
        Arc::new(TimeoutMessenger::new(raw_messenger, cfg.surface_timeout));

    let service = Arc::new(ConfessionService::new(
        cfg.policy(),
        store,
        messenger.clone(),
        AuditLogger::new(cfg.audit_log_path.clone(), cfg.audit_log_json),
    ));

    if cfg.post_panel_on_start {
        match messenger
            .send_html(cfg.gossip_chat_id, &panel_html(&cfg.author_name))
            .await
        {
            Ok(_) => tracing::info!("welcome panel posted"),
            Err(e) => tracing::warn!(error = %e, "posting welcome panel failed"),
        }
    }

    let state = Arc::new(AppState {
        cfg,
        service,
        messenger,
    });

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("dispatcher stopped");
    Ok(())
}

use std::sync::Arc;

use teloxide::prelude::*;

use gossip_core::messaging::types::ReviewAction;

use crate::router::AppState;

use super::{actor_from, report};

pub async fn handle_callback(
    _bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let data = q.data.clone().unwrap_or_default();

    // Parse callback data: gossip:{approve|deny}:{submission_id}
    let Some((action, id)) = ReviewAction::parse_callback(&data) else {
        answer(&state, &q.id, None).await;
        return Ok(());
    };

    let moderator = actor_from(&q.from);
    let res = match action {
        ReviewAction::Approve => state.service.approve(&moderator, &id).await,
        ReviewAction::Deny => state.service.deny(&moderator, &id).await,
    };

    let text = match res {
        Ok(_) if action == ReviewAction::Approve => "✅ Approved and published.",
        Ok(_) => "⛔ Denied.",
        Err(e) => report("review", &moderator, &e),
    };

    // Always answer, or the client keeps spinning.
    answer(&state, &q.id, Some(text)).await;
    Ok(())
}

async fn answer(state: &AppState, callback_id: &str, text: Option<&str>) {
    if let Err(e) = state.messenger.answer_callback_query(callback_id, text).await {
        tracing::warn!(error = %e, "answering callback query failed");
    }
}

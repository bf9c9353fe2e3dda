//! Event handlers: /start deep links, /getlink, /stats, and new-member credits.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::referral::deeplink::{parse_start_param, referral_deep_link};
use crate::referral::ledger::Ledger;
use crate::referral::reward::RewardNotifier;
use crate::referral::telegram::TelegramClient;

const WELCOME_VIA_LINK: &str = "خوش اومد! شما با لینک دعوت وارد این گروه شدی :)";
const ONBOARDING: &str = "درود! من تعداد نفراتی رو که با ما آشنا میکنی میشمرم! \
    با /getlink لینک دعوتت رو دریافت کن و با /stats ببین چند نفر رو تا حالا معرفی کردی";
const LINK_FAILED: &str = "ببخشید! نتونستم لینک بسازم. ادمین عیب یابی میکنه و درستش میکنه";
const STATS_EMPTY: &str = "فعلاً کسی از طرف شما نپیوسته!";

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    /// Optionally carries a referral deep-link payload.
    Start(String),
    GetLink,
    Stats,
}

/// Shared state available to every handler.
pub struct BotState {
    pub config: Config,
    pub ledger: Ledger,
    pub telegram: TelegramClient,
    pub reward: RewardNotifier,
    pub bot_user_id: i64,
    pub bot_username: String,
}

/// Outcome of applying a /start argument to the ledger.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum StartCredit {
    /// The inviter was credited; holds the post-increment count.
    Credited { inviter_id: i64, count: u32 },
    /// The argument named the subject themselves; ledger untouched.
    SelfReferral,
    /// The argument was not a well-formed `inviter_<id>` payload.
    Malformed,
}

/// Attribute a deep-link referral. Self-referrals are rejected here; the
/// direct-addition path has no such check (kept as in the original bot).
pub(crate) fn credit_from_start_arg(
    ledger: &Ledger,
    arg: &str,
    subject_id: i64,
) -> rusqlite::Result<StartCredit> {
    let Some(inviter_id) = parse_start_param(arg) else {
        return Ok(StartCredit::Malformed);
    };
    if inviter_id == subject_id {
        return Ok(StartCredit::SelfReferral);
    }
    let count = ledger.credit_referral(inviter_id)?;
    Ok(StartCredit::Credited { inviter_id, count })
}

pub async fn handle_command(msg: Message, cmd: Command, state: Arc<BotState>) -> ResponseResult<()> {
    let user = match msg.from {
        Some(ref u) => u,
        None => return Ok(()),
    };
    let user_id = user.id.0 as i64;
    let chat_id = msg.chat.id.0;
    let reply_to = Some(msg.id.0 as i64);

    match cmd {
        Command::Start(arg) => {
            info!("Start handler triggered by user {}", user_id);
            let arg = arg.trim();

            if arg.is_empty() {
                state.telegram.send_message(chat_id, ONBOARDING, reply_to).await.ok();
                return Ok(());
            }

            match credit_from_start_arg(&state.ledger, arg, user_id) {
                Ok(StartCredit::Credited { inviter_id, count }) => {
                    info!(
                        "User {} invited user {} via link. Total referrals: {}",
                        inviter_id, user_id, count
                    );
                    if count == state.config.referral_threshold {
                        let group = state.config.group_chat_id.0;
                        if let Err(e) =
                            state.reward.notify(&state.telegram, group, inviter_id).await
                        {
                            warn!("Failed to announce reward for {inviter_id}: {e}");
                        }
                    }
                }
                Ok(StartCredit::SelfReferral) => {
                    info!("Ignoring self-referral from user {}", user_id);
                }
                Ok(StartCredit::Malformed) => {
                    warn!("Malformed start parameter from user {}: {:?}", user_id, arg);
                }
                Err(e) => {
                    warn!("Error processing referral: {e}");
                }
            }

            // Whatever happened to the credit, the new member gets greeted.
            state.telegram.send_message(chat_id, WELCOME_VIA_LINK, reply_to).await.ok();
        }

        Command::GetLink => {
            info!("Get_link handler triggered by user {} in chat {}", user_id, chat_id);
            match issue_link(&state, user_id, chat_id).await {
                Ok(deep_link) => {
                    let text = format!(
                        "لینک اختصاصی شما: {deep_link}\n\
                         هم میتونی خودت اد کنی و هم این لینک رو برای دوستات بفرستی"
                    );
                    state.telegram.send_message(chat_id, &text, reply_to).await.ok();
                }
                Err(e) => {
                    warn!("Error generating invite link: {e}");
                    state.telegram.send_message(chat_id, LINK_FAILED, reply_to).await.ok();
                }
            }
        }

        Command::Stats => {
            info!("Stats handler triggered by user {}", user_id);
            let stats = match state.ledger.stats() {
                Ok(s) => s,
                Err(e) => {
                    warn!("Error reading stats: {e}");
                    state.telegram.send_message(chat_id, STATS_EMPTY, reply_to).await.ok();
                    return Ok(());
                }
            };

            if stats.is_empty() {
                state.telegram.send_message(chat_id, STATS_EMPTY, reply_to).await.ok();
                return Ok(());
            }

            let mut text = String::from("تعداد دعوت‌ها:\n");
            for stat in stats {
                // Display names are resolved live against the group; a failed
                // lookup falls back to the raw id instead of aborting the report.
                let name = match state
                    .telegram
                    .get_chat_member(state.config.group_chat_id.0, stat.user_id)
                    .await
                {
                    Ok(member) => member.first_name,
                    Err(e) => {
                        warn!("Name lookup failed for {}: {e}", stat.user_id);
                        stat.user_id.to_string()
                    }
                };
                text.push_str(&format!(
                    "{} ({}): {} نفر\n",
                    name, stat.user_id, stat.referral_count
                ));
            }
            state.telegram.send_message(chat_id, &text, reply_to).await.ok();
        }
    }

    Ok(())
}

/// Mint a fresh token, record it, ask Telegram for its own single-use invite
/// link object, and hand back the deep link carrying the requester's id.
async fn issue_link(state: &BotState, user_id: i64, chat_id: i64) -> Result<String, String> {
    let link_id = Uuid::new_v4().simple().to_string();
    state
        .ledger
        .store_invite_link(user_id, &link_id)
        .map_err(|e| format!("Failed to store invite link: {e}"))?;

    // The platform object enforces single use via its member limit; the
    // local token is retained for audit only.
    state
        .telegram
        .create_invite_link(chat_id, &format!("Invite by {user_id}"), 1)
        .await?;

    Ok(referral_deep_link(&state.bot_username, user_id))
}

/// Credit direct additions: every member in a `new_chat_members` service
/// message is attributed to the message's sender.
pub async fn handle_new_members(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let chat_id = msg.chat.id.0;
    let Some(members) = msg.new_chat_members() else {
        return Ok(());
    };
    info!("New_member handler triggered in chat {}", chat_id);

    for member in members {
        // Skip if the new member is the bot itself
        if member.id.0 as i64 == state.bot_user_id {
            continue;
        }

        let Some(ref inviter) = msg.from else {
            warn!("No inviter found for new member {}", member.id);
            continue;
        };
        let inviter_id = inviter.id.0 as i64;
        if inviter_id == state.bot_user_id {
            continue;
        }
        info!("Inviter ID: {}, New member: {}", inviter_id, member.id);

        match state.ledger.credit_referral(inviter_id) {
            Ok(count) => {
                info!(
                    "User {} directly added a new member. Total referrals: {}",
                    inviter_id, count
                );
                if count == state.config.referral_threshold {
                    if let Err(e) = state.reward.notify(&state.telegram, chat_id, inviter_id).await
                    {
                        warn!("Failed to announce reward for {inviter_id}: {e}");
                    }
                }
            }
            Err(e) => {
                warn!("Error processing direct addition: {e}");
            }
        }
    }

    Ok(())
}

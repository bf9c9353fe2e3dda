//! Telegram client using teloxide.

use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId, ReplyParameters};
use tracing::{info, warn};

/// User info from Telegram.
pub struct ChatMemberInfo {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: String,
}

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to_message_id: Option<i64>,
    ) -> Result<(), String> {
        let chat_id = ChatId(chat_id);
        let mut request = self.bot.send_message(chat_id, text);

        if let Some(msg_id) = reply_to_message_id {
            let reply_params = ReplyParameters::new(MessageId(msg_id as i32));
            request = request.reply_parameters(reply_params);
        }

        request.await.map(|_| ()).map_err(|e| {
            let msg = format!("Failed to send: {e}");
            warn!("{}", msg);
            msg
        })
    }

    pub async fn get_chat_member(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<ChatMemberInfo, String> {
        info!("Getting chat member: chat={}, user={}", chat_id, user_id);
        let chat_id = ChatId(chat_id);
        let user_id = UserId(user_id as u64);

        let member = self
            .bot
            .get_chat_member(chat_id, user_id)
            .await
            .map_err(|e| {
                let msg = format!("Failed to get chat member: {e}");
                warn!("{}", msg);
                msg
            })?;

        Ok(ChatMemberInfo {
            user_id: member.user.id.0 as i64,
            username: member.user.username.clone(),
            first_name: member.user.first_name.clone(),
        })
    }

    /// Create a native Telegram invite link for the chat.
    ///
    /// Returns the platform's link URL. Single-use enforcement comes from the
    /// member limit on the platform object.
    pub async fn create_invite_link(
        &self,
        chat_id: i64,
        name: &str,
        member_limit: u32,
    ) -> Result<String, String> {
        info!("Creating invite link for chat {} (limit {})", chat_id, member_limit);

        let link = self
            .bot
            .create_chat_invite_link(ChatId(chat_id))
            .name(name.to_string())
            .creates_join_request(false)
            .member_limit(member_limit)
            .await
            .map_err(|e| {
                let msg = format!("Failed to create invite link: {e}");
                warn!("{}", msg);
                msg
            })?;

        Ok(link.invite_link)
    }

    /// Send an image from bytes.
    pub async fn send_photo(&self, chat_id: i64, image_data: Vec<u8>) -> Result<(), String> {
        info!("📷 Sending photo to chat {} ({} bytes)", chat_id, image_data.len());

        let chat_id = ChatId(chat_id);
        let input_file = InputFile::memory(image_data).file_name("reward.png");

        self.bot.send_photo(chat_id, input_file).await.map(|_| ()).map_err(|e| {
            let msg = format!("Failed to send photo: {e}");
            warn!("{}", msg);
            msg
        })
    }
}

//! Reward announcement sent when an inviter reaches the threshold.

use crate::referral::telegram::TelegramClient;
use tracing::info;

/// Fetches the reward image and announces threshold crossings in the group.
pub struct RewardNotifier {
    http: reqwest::Client,
    image_url: String,
}

impl RewardNotifier {
    pub fn new(image_url: String) -> Self {
        Self { http: reqwest::Client::new(), image_url }
    }

    /// Announce that `inviter_id` reached the threshold: a congratulatory
    /// message addressed by first name, followed by the reward photo.
    ///
    /// The caller only invokes this on the single increment that lands
    /// exactly on the threshold, so it fires once per inviter.
    pub async fn notify(
        &self,
        telegram: &TelegramClient,
        chat_id: i64,
        inviter_id: i64,
    ) -> Result<(), String> {
        let inviter = telegram.get_chat_member(chat_id, inviter_id).await?;
        info!("🎉 {} ({}) reached the referral threshold", inviter.first_name, inviter_id);

        let congrats = format!(
            "🎉 تبریک میگم {}! 🎉\n\
             تو ۳۰ تا از دوستات رو وارد گروه کردی تا پوست و موی بهتری داشته باشن!\n\
             لطفاً هدیه‌ت رو انتخاب کن و به ادمین گروه اطلاع بده تا برات ارسال کنه",
            inviter.first_name
        );
        telegram.send_message(chat_id, &congrats, None).await?;

        let image = self.fetch_image().await?;
        telegram.send_photo(chat_id, image).await
    }

    async fn fetch_image(&self) -> Result<Vec<u8>, String> {
        let response = self
            .http
            .get(&self.image_url)
            .send()
            .await
            .map_err(|e| format!("Failed to fetch reward image: {e}"))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| format!("Failed to read reward image body: {e}"))?;

        info!("Fetched reward image ({} bytes)", bytes.len());
        Ok(bytes.to_vec())
    }
}

//! Referral module - tracks who brought whom into the group.

pub mod deeplink;
pub mod handlers;
pub mod ledger;
pub mod reward;
pub mod telegram;


pub use handlers::{BotState, Command, handle_command, handle_new_members};
pub use ledger::{Ledger, ReferralStat};
pub use reward::RewardNotifier;
pub use telegram::TelegramClient;

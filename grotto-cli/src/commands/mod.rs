pub mod admin;
pub mod session;
pub mod settle;
pub mod view;
pub mod wager;

pub use admin::{grant, init};
pub use session::Session;
pub use settle::{claim, claim_creator, claim_platform, end, find_winner, force_end, withdraw};
pub use view::{balance, list, show, stats, ListArgs};
pub use wager::{handle_lotto_command, handle_pot_command, LottoCommands, PotCommands};

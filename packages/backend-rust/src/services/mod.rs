pub mod card_selector;
pub mod mastery;
pub mod progress;
pub mod scheduler;
pub mod session;

pub mod events;
pub mod history;
pub mod messages;
pub mod operator;
pub mod presence;

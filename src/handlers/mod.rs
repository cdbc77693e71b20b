pub mod auth;
pub mod chat;
pub mod health;
pub mod i18n;
pub mod notifications;
pub mod schedules;
pub mod ws;

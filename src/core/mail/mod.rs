//! Outbound mail for emailed reports

pub mod http_relay_sender;
pub mod mail_sender;

pub mod installments;
pub mod message_log;
pub mod settings;

pub mod installment;
pub mod message_log;
pub mod settings;

pub use installment::NotifiableInstallment;
pub use message_log::MessageLogEntry;
pub use settings::AutomationSettings;

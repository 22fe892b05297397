pub mod command_channel;
pub mod correlation;
pub mod observability;

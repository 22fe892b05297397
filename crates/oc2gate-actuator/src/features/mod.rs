pub mod command_dispatch;

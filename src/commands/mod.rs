mod add;
mod config_cmd;
mod delete;
mod get;
mod update;

use clap::ValueEnum;

pub use add::AddCommand;
pub use config_cmd::ConfigCommand;
pub use delete::DeleteCommand;
pub use get::GetCommand;
pub use update::UpdateCommand;

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

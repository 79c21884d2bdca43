mod command_infrastructure;

pub use command_infrastructure::{parse_member_lines, render_command, CommandInfrastructure};

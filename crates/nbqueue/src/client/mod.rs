pub mod commands;
pub mod globalsettings;
pub mod rundef;
pub mod utils;

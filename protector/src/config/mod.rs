mod env_helper;
mod local_config;

pub use env_helper::{load_env_var, load_env_var_or, load_optional_env_var};
pub use local_config::LocalConfig;

mod env_overrides;
mod loader;
#[cfg(test)]
mod test_env;
mod types;
mod validation;

pub use types::Config;

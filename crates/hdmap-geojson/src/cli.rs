use clap::Parser;

/// Read an environment variable, `None` when unset or not parseable as `T`
pub fn get_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

/// Parse the process arguments into `T`
pub fn parse_args<T: Parser>() -> Result<T, clap::Error> {
    T::try_parse()
}

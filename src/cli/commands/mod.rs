pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let command = Command::new("sigillo")
        .about("Federated authentication and token exchange")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("SIGILLO_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("public-url")
                .long("public-url")
                .help("Public base URL used in login links, cookies, and CORS")
                .default_value("http://localhost:8080")
                .env("SIGILLO_PUBLIC_URL"),
        )
        .arg(
            Arg::new("issuer")
                .long("issuer")
                .help("Issuer claim for minted access tokens (defaults to the public URL)")
                .env("SIGILLO_ISSUER"),
        )
        .arg(
            Arg::new("state-dir")
                .short('s')
                .long("state-dir")
                .help("Directory holding the signing key and token pepper")
                .default_value("state")
                .env("SIGILLO_STATE_DIR"),
        )
        .arg(
            Arg::new("login-token-ttl")
                .long("login-token-ttl")
                .help("Login token lifetime in seconds")
                .default_value("900")
                .env("SIGILLO_LOGIN_TOKEN_TTL")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("session-ttl")
                .long("session-ttl")
                .help("Session sliding expiry in seconds")
                .default_value("43200")
                .env("SIGILLO_SESSION_TTL")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("access-token-ttl")
                .long("access-token-ttl")
                .help("Access token (JWT) lifetime in seconds")
                .default_value("1800")
                .env("SIGILLO_ACCESS_TOKEN_TTL")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("rate-window")
                .long("rate-window")
                .help("Rate limit window in seconds")
                .default_value("900")
                .env("SIGILLO_RATE_WINDOW")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("login-limit")
                .long("login-limit")
                .help("Login requests allowed per email per window")
                .default_value("10")
                .env("SIGILLO_LOGIN_LIMIT")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("ip-limit")
                .long("ip-limit")
                .help("Login requests allowed per source address per window")
                .default_value("30")
                .env("SIGILLO_IP_LIMIT")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("exchange-limit")
                .long("exchange-limit")
                .help("Token exchange attempts allowed per source address per window")
                .default_value("60")
                .env("SIGILLO_EXCHANGE_LIMIT")
                .value_parser(clap::value_parser!(usize)),
        );

    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "sigillo");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some("Federated authentication and token exchange".to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_defaults() {
        temp_env::with_vars(
            [
                ("SIGILLO_PORT", None::<&str>),
                ("SIGILLO_PUBLIC_URL", None),
                ("SIGILLO_ISSUER", None),
                ("SIGILLO_STATE_DIR", None),
            ],
            || {
                let command = new();
                let matches = command.get_matches_from(vec!["sigillo"]);

                assert_eq!(matches.get_one::<u16>("port").copied(), Some(8080));
                assert_eq!(
                    matches.get_one::<String>("public-url").cloned(),
                    Some("http://localhost:8080".to_string())
                );
                assert_eq!(matches.get_one::<String>("issuer"), None);
                assert_eq!(
                    matches.get_one::<String>("state-dir").cloned(),
                    Some("state".to_string())
                );
                assert_eq!(
                    matches.get_one::<i64>("login-token-ttl").copied(),
                    Some(900)
                );
                assert_eq!(matches.get_one::<i64>("session-ttl").copied(), Some(43200));
                assert_eq!(
                    matches.get_one::<i64>("access-token-ttl").copied(),
                    Some(1800)
                );
                assert_eq!(matches.get_one::<usize>("login-limit").copied(), Some(10));
            },
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("SIGILLO_PORT", Some("443")),
                ("SIGILLO_PUBLIC_URL", Some("https://auth.example.test")),
                ("SIGILLO_ISSUER", Some("https://issuer.test")),
                ("SIGILLO_STATE_DIR", Some("/var/lib/sigillo")),
                ("SIGILLO_LOGIN_LIMIT", Some("3")),
                ("SIGILLO_LOG_LEVEL", Some("info")),
            ],
            || {
                let command = new();
                let matches = command.get_matches_from(vec!["sigillo"]);
                assert_eq!(matches.get_one::<u16>("port").copied(), Some(443));
                assert_eq!(
                    matches.get_one::<String>("public-url").cloned(),
                    Some("https://auth.example.test".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>("issuer").cloned(),
                    Some("https://issuer.test".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>("state-dir").cloned(),
                    Some("/var/lib/sigillo".to_string())
                );
                assert_eq!(matches.get_one::<usize>("login-limit").copied(), Some(3));
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(2)
                );
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        // loop cover all possible value_parse
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars([("SIGILLO_LOG_LEVEL", Some(level))], || {
                let command = new();
                let matches = command.get_matches_from(vec!["sigillo"]);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, _) in levels.iter().enumerate() {
            temp_env::with_vars([("SIGILLO_LOG_LEVEL", None::<String>)], || {
                let mut args = vec!["sigillo".to_string()];
                if index > 0 {
                    let v = format!("-{}", "v".repeat(index));
                    args.push(v);
                }

                let command = new();
                let matches = command.get_matches_from(args);

                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }

    #[test]
    fn test_invalid_port_rejected() {
        temp_env::with_vars([("SIGILLO_PORT", None::<&str>)], || {
            let command = new();
            let result = command.try_get_matches_from(vec!["sigillo", "--port", "not-a-port"]);
            assert_eq!(
                result.map_err(|e| e.kind()),
                Err(clap::error::ErrorKind::ValueValidation)
            );
        });
    }
}

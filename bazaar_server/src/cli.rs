use std::env;

const HELP: &str = include_str!("./cli-help.txt");

/// Environment variables shown by `--help`. Secrets are only reported as present or absent.
const ENV_VARS: [(&str, bool); 10] = [
    ("RUST_LOG", false),
    ("BAZAAR_HOST", false),
    ("BAZAAR_PORT", false),
    ("BAZAAR_DATABASE_URL", false),
    ("BAZAAR_JWT_SECRET", true),
    ("BAZAAR_TOKEN_LIFETIME_HOURS", false),
    ("BAZAAR_OTP_TTL_SECS", false),
    ("BAZAAR_PAYMENT_SECRET", true),
    ("BAZAAR_WEBHOOK_SECRET", true),
    ("BAZAAR_WEBHOOK_HMAC_CHECKS", false),
];

/// The server takes no arguments. Any argument at all prints the help text and the current environment, and returns
/// true to tell `main` to exit.
pub fn handle_command_line_args() -> bool {
    if env::args().len() <= 1 {
        return false;
    }
    println!("\n{HELP}\n");
    println!("Current environment:");
    for (name, secret) in ENV_VARS {
        println!("  {name:<30} {}", describe_env(name, secret));
    }
    true
}

fn describe_env(name: &str, secret: bool) -> String {
    match env::var_os(name) {
        None => "Not set".into(),
        Some(_) if secret => "Set (hidden)".into(),
        Some(v) => match v.into_string() {
            Ok(s) => s,
            Err(raw) => format!("Invalid value: {}", raw.to_string_lossy()),
        },
    }
}

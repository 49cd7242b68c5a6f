//! Grid Auth Admin Tool
//!
//! Operator entry point for the login rate limiter and the password
//! credential subsystem. Uses `anyhow` for startup errors, but
//! library errors keep their `kernel::error::AppError` mapping.
//!
//! Passwords are always read from stdin, never from the command line.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use credential::{
    CheckOptions, ClearTextPassword, CredentialChecker, CredentialConfig, LoginContext,
    StoredCredential, TokenService, generate_random_password,
};
use kernel::error::app_error::{AppError, AppResult, ResultExt};
use kernel::error::kind::ErrorKind;
use ratelimit::{RateLimitConfig, RateLimiter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "gridauth")]
#[command(about = "Login rate limits and password credentials for grid services")]
#[command(version)]
struct Cli {
    /// Rate limit run directory (defaults to GRIDAUTH_RUN_DIR)
    #[arg(long, global = true)]
    run_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tell whether a login would be refused
    CheckLimit {
        #[arg(long)]
        address: String,
        #[arg(long)]
        proto: String,
        #[arg(long)]
        identity: String,
    },

    /// Record a login attempt
    Record {
        #[arg(long)]
        address: String,
        #[arg(long)]
        proto: String,
        #[arg(long)]
        identity: String,
        /// The attempt succeeded
        #[arg(long)]
        success: bool,
        /// Fingerprint the password read from stdin as the attempt secret
        #[arg(long)]
        secret_stdin: bool,
    },

    /// Forget failures older than the fail window
    Expire {
        #[arg(long)]
        proto: String,
        /// Ignore the delay between runs
        #[arg(long)]
        force: bool,
    },

    /// Print the counter table of a protocol
    Show {
        #[arg(long)]
        proto: String,
    },

    /// Hash a new password
    Hash {
        /// Skip the site policy
        #[arg(long)]
        no_policy: bool,
    },

    /// Check a password against a stored value
    Verify {
        /// Stored value (PBKDF2, digest, encrypted or scrambled)
        #[arg(long)]
        stored: String,
        #[arg(long, default_value = "gridauth")]
        service: String,
        #[arg(long, default_value = "")]
        username: String,
        #[arg(long, default_value = "")]
        realm: String,
        /// Accept the legacy policy too, as for an interactive login
        #[arg(long, conflicts_with = "relaxed")]
        login: bool,
        /// Do not enforce the site policy
        #[arg(long)]
        relaxed: bool,
    },

    /// Check a password against the site policy
    CheckPolicy {
        /// Accept the legacy policy too
        #[arg(long)]
        legacy: bool,
    },

    /// Generate a random password fitting the site policy
    GenPassword {
        #[arg(long, default_value_t = credential::DEFAULT_TRIES)]
        tries: usize,
    },

    /// Make or verify a CSRF token
    Csrf {
        #[arg(long, default_value = "POST")]
        method: String,
        #[arg(long)]
        operation: String,
        #[arg(long)]
        identity: String,
        #[arg(long)]
        limit: Option<String>,
        /// Query argument folded into a trust token, as KEY=VALUE (repeatable)
        #[arg(long = "arg", value_parser = parse_key_value)]
        args: Vec<(String, String)>,
        /// Verify this token instead of printing a new one
        #[arg(long)]
        verify: Option<String>,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "gridauth=info,ratelimit=info,credential=info,platform=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let mut limits = RateLimitConfig::from_env();
    if let Some(run_dir) = cli.run_dir {
        limits.run_dir = run_dir;
    }
    let credentials = CredentialConfig::from_env();
    tracing::debug!(?limits, ?credentials, "Loaded configuration");

    match cli.command {
        Commands::CheckLimit {
            address,
            proto,
            identity,
        } => {
            let limiter = RateLimiter::from_config(limits);
            match limiter.admit(&address, &proto, &identity) {
                Ok(()) => {
                    println!("allowed");
                    Ok(ExitCode::SUCCESS)
                }
                Err(err) => {
                    let err = AppError::from(err);
                    println!("refused: {}", err.user_message());
                    Ok(ExitCode::FAILURE)
                }
            }
        }

        Commands::Record {
            address,
            proto,
            identity,
            success,
            secret_stdin,
        } => {
            let secret = if secret_stdin {
                Some(platform::crypto::simple_hash(read_password()?.as_str()))
            } else {
                None
            };
            let limiter = RateLimiter::from_config(limits);
            let hits = limiter.record_attempt(&address, &proto, &identity, success, secret.as_deref());
            println!("{}", serde_json::to_string(&hits)?);
            Ok(ExitCode::SUCCESS)
        }

        Commands::Expire { proto, force } => {
            if force {
                limits.expire_delay = std::time::Duration::ZERO;
            }
            let limiter = RateLimiter::from_config(limits);
            let expired = limiter.expire_entries(&proto);
            if expired < 0 {
                println!("postponed for {}s", -expired);
            } else {
                println!("expired {}", expired);
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Show { proto } => {
            let limiter = RateLimiter::from_config(limits);
            let table = limiter
                .snapshot(&proto)
                .with_context(|| format!("Failed to read rate limits for {}", proto))?;
            println!("{}", serde_json::to_string_pretty(&table)?);
            Ok(ExitCode::SUCCESS)
        }

        Commands::Hash { no_policy } => {
            let checker = CredentialChecker::from_config(&credentials)?;
            let password = read_password()?;
            if !no_policy {
                checker.policy().assure_strength(password.as_str(), false)?;
            }
            println!("{}", checker.make_hash(&password));
            Ok(ExitCode::SUCCESS)
        }

        Commands::Verify {
            stored,
            service,
            username,
            realm,
            login,
            relaxed,
        } => {
            let checker = CredentialChecker::from_config(&credentials)?;
            let password = read_password()?;
            let options = if login {
                CheckOptions::login()
            } else if relaxed {
                CheckOptions::relaxed()
            } else {
                CheckOptions::default()
            };
            let ctx = LoginContext::new(&service, &username).with_realm(&realm);

            let matched = checker.check(&ctx, &password, &stored, None, options)?;
            println!("{}", if matched { "match" } else { "mismatch" });
            if matched {
                if let Ok(parsed) = StoredCredential::parse(&stored) {
                    if checker.hasher().needs_rehash(&parsed) {
                        println!("rehash recommended ({} stored)", parsed.scheme());
                    }
                }
            }
            Ok(if matched {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Commands::CheckPolicy { legacy } => {
            let checker = CredentialChecker::from_config(&credentials)?;
            let password = read_password()?;
            match checker.policy().assure_strength(password.as_str(), legacy) {
                Ok(()) => {
                    println!("ok");
                    Ok(ExitCode::SUCCESS)
                }
                Err(err) => {
                    let err = err.to_app_error();
                    println!("{}", err.user_message());
                    if let Some(action) = err.action() {
                        println!("{}", action);
                    }
                    Ok(ExitCode::FAILURE)
                }
            }
        }

        Commands::GenPassword { tries } => {
            let checker = CredentialChecker::from_config(&credentials)?;
            let password = generate_random_password(checker.policy(), tries)?;
            println!("{}", password.as_str());
            Ok(ExitCode::SUCCESS)
        }

        Commands::Csrf {
            method,
            operation,
            identity,
            limit,
            args,
            verify,
        } => {
            let tokens = TokenService::from_config(&credentials)?;
            let operation = if args.is_empty() {
                operation
            } else {
                let grouped = group_args(args);
                platform::csrf::trust_operation(
                    &operation,
                    grouped,
                    credential::application::tokens::DEFAULT_SKIP_FIELDS,
                )
            };

            match verify {
                Some(token) => {
                    let valid =
                        tokens.verify(&token, &method, &operation, &identity, limit.as_deref());
                    println!("{}", if valid { "valid" } else { "invalid" });
                    Ok(if valid {
                        ExitCode::SUCCESS
                    } else {
                        ExitCode::FAILURE
                    })
                }
                None => {
                    let token =
                        tokens.csrf_token(&method, &operation, &identity, limit.as_deref())?;
                    println!("{}", token);
                    Ok(ExitCode::SUCCESS)
                }
            }
        }
    }
}

/// First line of stdin, without the line ending
fn read_password() -> AppResult<ClearTextPassword> {
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_app_err(ErrorKind::Internal, "Failed to read password from stdin")?;
    let trimmed = line.trim_end_matches(['\r', '\n']).to_string();
    line.clear();
    Ok(ClearTextPassword::new(trimmed))
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got {:?}", raw))
}

// Repeated keys collect their values in command line order.
fn group_args(args: Vec<(String, String)>) -> Vec<(String, Vec<String>)> {
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for (key, value) in args {
        match grouped.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => grouped.push((key, vec![value])),
        }
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("path=a=b").unwrap(),
            ("path".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("path").is_err());
    }

    #[test]
    fn test_group_args_keeps_value_order() {
        let grouped = group_args(vec![
            ("path".to_string(), "b".to_string()),
            ("flags".to_string(), "r".to_string()),
            ("path".to_string(), "a".to_string()),
        ]);
        assert_eq!(
            grouped,
            vec![
                ("path".to_string(), vec!["b".to_string(), "a".to_string()]),
                ("flags".to_string(), vec!["r".to_string()]),
            ]
        );
    }
}

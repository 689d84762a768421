//! CLI argument parsing and command dispatch.

use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use kvs_client::{
    map_from_pairs, ClientOptions, Deadline, Float, Int, KvsClient, KvsError, Map, RetryPolicy,
    Session, Storage, Str, Uint, DEFAULT_SERVICE_URL,
};

use crate::output::{print_outcomes, Line, Render};

/// Command-line interface for the KVS key-value service.
#[derive(Parser)]
#[command(name = "kvs-cli")]
#[command(version)]
#[command(about = "Command-line interface for the KVS key-value service")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Commands,
}

/// Global options available to all commands.
#[derive(Args, Clone)]
pub struct GlobalOptions {
    /// KVS service address.
    #[arg(long, env = "KVS_SERVICE_URL", default_value = DEFAULT_SERVICE_URL, global = true)]
    pub url: String,

    /// Per-request timeout in milliseconds.
    #[arg(long = "timeout", default_value = "100000", global = true)]
    pub timeout_ms: u64,

    /// Total tries per request, the first one included.
    #[arg(long = "attempts", default_value = "5", global = true)]
    pub max_attempts: usize,

    /// Delay between tries in milliseconds.
    #[arg(long = "retry-delay", default_value = "2000", global = true)]
    pub retry_delay_ms: u64,

    /// Enable verbose logging.
    #[arg(short = 'v', long = "verbose", global = true)]
    pub is_verbose: bool,

    /// Suppress all logging output.
    #[arg(short = 'q', long = "quiet", global = true)]
    pub is_quiet: bool,
}

impl GlobalOptions {
    fn client(&self) -> Result<KvsClient> {
        let options = ClientOptions {
            timeout_ms: self.timeout_ms,
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                base_delay_ms: self.retry_delay_ms,
                ..RetryPolicy::default()
            },
            ..ClientOptions::default()
        };
        Ok(KvsClient::new(&self.url)?.with_options(options))
    }
}

/// Service commands.
///
/// Pairs are written `key:value` and split on the last `:`.
#[derive(Subcommand)]
pub enum Commands {
    /// Invoke the echo procedure once per argument.
    Echo { args: Vec<String> },
    /// Invoke the hello procedure. Does not modify storage state.
    Hello,
    /// Compute Fibonacci numbers; each call is cancelled after 10 seconds.
    Fibo { indices: Vec<u32> },

    /// Put integers.
    IntPut { pairs: Vec<String> },
    /// Get integers.
    IntGet { keys: Vec<String> },
    /// Delete integers.
    IntDel { keys: Vec<String> },
    /// Increment integers by one, printing the previous values.
    IntIncr { keys: Vec<String> },
    /// Increment an integer by `value`, printing the previous value.
    IntIncrBy {
        key: String,
        #[arg(allow_hyphen_values = true)]
        value: i32,
    },

    /// Put unsigned integers.
    UintPut { pairs: Vec<String> },
    /// Get unsigned integers.
    UintGet { keys: Vec<String> },
    /// Delete unsigned integers.
    UintDel { keys: Vec<String> },

    /// Put floats.
    FloatPut { pairs: Vec<String> },
    /// Get floats.
    FloatGet { keys: Vec<String> },
    /// Delete floats.
    FloatDel { keys: Vec<String> },

    /// Put strings.
    StrPut { pairs: Vec<String> },
    /// Get strings.
    StrGet { keys: Vec<String> },
    /// Delete strings.
    StrDel { keys: Vec<String> },

    /// Put one map built from `name=value` entries.
    #[command(alias = "dict-put")]
    MapPut { key: String, entries: Vec<String> },
    /// Get maps.
    #[command(alias = "dict-get")]
    MapGet { keys: Vec<String> },
    /// Delete maps.
    #[command(alias = "dict-del")]
    MapDel { keys: Vec<String> },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::Echo { .. } => "echo",
            Self::Hello => "hello",
            Self::Fibo { .. } => "fibo",
            Self::IntPut { .. } => "int-put",
            Self::IntGet { .. } => "int-get",
            Self::IntDel { .. } => "int-del",
            Self::IntIncr { .. } => "int-incr",
            Self::IntIncrBy { .. } => "int-incr-by",
            Self::UintPut { .. } => "uint-put",
            Self::UintGet { .. } => "uint-get",
            Self::UintDel { .. } => "uint-del",
            Self::FloatPut { .. } => "float-put",
            Self::FloatGet { .. } => "float-get",
            Self::FloatDel { .. } => "float-del",
            Self::StrPut { .. } => "str-put",
            Self::StrGet { .. } => "str-get",
            Self::StrDel { .. } => "str-del",
            Self::MapPut { .. } => "map-put",
            Self::MapGet { .. } => "map-get",
            Self::MapDel { .. } => "map-del",
        }
    }

    async fn execute(&self, session: &Session) -> Result<()> {
        let name = self.name();
        match self {
            Self::Echo { args } => {
                let outcomes = session
                    .batch()
                    .run(args.clone(), |s, arg| s.echo(arg))
                    .await?;
                print_outcomes(name, &outcomes, Line::Value);
            }
            Self::Hello => {
                let result = session.hello().await?;
                println!("{result}");
            }
            Self::Fibo { indices } => {
                let outcomes = session
                    .batch()
                    .with_deadline(Deadline::default())
                    .run(indices.clone(), |s, n| s.fibo(n))
                    .await?;
                print_outcomes(name, &outcomes, Line::Value);
            }
            Self::IntPut { pairs } => put::<Int>(session, name, pairs).await?,
            Self::IntGet { keys } => get::<Int>(session, name, keys).await?,
            Self::IntDel { keys } => delete::<Int>(session, name, keys).await?,
            Self::IntIncr { keys } => {
                let outcomes = session
                    .batch()
                    .run(keys.clone(), |s, key| s.incr(key))
                    .await?;
                print_outcomes(name, &outcomes, Line::Value);
            }
            Self::IntIncrBy { key, value } => {
                let outcomes = session
                    .batch()
                    .run([(key.clone(), *value)], |s, (key, by)| s.incr_by(key, by))
                    .await?;
                print_outcomes(name, &outcomes, Line::Value);
            }
            Self::UintPut { pairs } => put::<Uint>(session, name, pairs).await?,
            Self::UintGet { keys } => get::<Uint>(session, name, keys).await?,
            Self::UintDel { keys } => delete::<Uint>(session, name, keys).await?,
            Self::FloatPut { pairs } => put::<Float>(session, name, pairs).await?,
            Self::FloatGet { keys } => get::<Float>(session, name, keys).await?,
            Self::FloatDel { keys } => delete::<Float>(session, name, keys).await?,
            Self::StrPut { pairs } => put::<Str>(session, name, pairs).await?,
            Self::StrGet { keys } => get::<Str>(session, name, keys).await?,
            Self::StrDel { keys } => delete::<Str>(session, name, keys).await?,
            Self::MapPut { key, entries } => {
                let map = map_from_pairs(entries.iter().map(String::as_str));
                let outcomes = session
                    .batch()
                    .run([(key.clone(), map)], |s, (key, map)| s.put::<Map>(key, map))
                    .await?;
                print_outcomes(name, &outcomes, Line::Status);
            }
            Self::MapGet { keys } => get::<Map>(session, name, keys).await?,
            Self::MapDel { keys } => delete::<Map>(session, name, keys).await?,
        }
        Ok(())
    }
}

impl Cli {
    /// Runs the command in a fresh session.
    ///
    /// Session-level failures are reported as a single line instead of an
    /// error chain.
    pub async fn run(self) -> Result<()> {
        let name = self.command.name();
        let kvs = self.global.client()?;
        let command = &self.command;
        let outcome = kvs
            .scope(async |session: &Session| command.execute(session).await)
            .await?;

        match outcome {
            Err(err) => match err.downcast_ref::<KvsError>() {
                Some(KvsError::Disconnected(_)) => {
                    println!("Command '{name}' failed, server disconnected.");
                    Ok(())
                }
                Some(KvsError::Timeout(_)) => {
                    println!("Command '{name}' failed, timeout.");
                    Ok(())
                }
                _ => Err(err),
            },
            Ok(()) => Ok(()),
        }
    }
}

async fn put<S>(session: &Session, name: &str, pairs: &[String]) -> Result<()>
where
    S: Storage,
    S::Value: FromStr,
    <S::Value as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    let inputs = pairs
        .iter()
        .map(|pair| parse_pair::<S::Value>(pair))
        .collect::<Result<Vec<_>>>()?;
    let outcomes = session
        .batch()
        .run(inputs, |s, (key, value)| s.put::<S>(key, value))
        .await?;
    print_outcomes(name, &outcomes, Line::Status);
    Ok(())
}

async fn get<S>(session: &Session, name: &str, keys: &[String]) -> Result<()>
where
    S: Storage,
    S::Value: Render,
{
    let outcomes = session
        .batch()
        .run(keys.to_vec(), |s, key| s.get::<S>(key))
        .await?;
    print_outcomes(name, &outcomes, Line::Value);
    Ok(())
}

async fn delete<S: Storage>(session: &Session, name: &str, keys: &[String]) -> Result<()> {
    let outcomes = session
        .batch()
        .run(keys.to_vec(), |s, key| s.delete::<S>(key))
        .await?;
    print_outcomes(name, &outcomes, Line::Deleted);
    Ok(())
}

/// Splits `key:value` on the last `:`.
fn parse_pair<V>(pair: &str) -> Result<(String, V)>
where
    V: FromStr,
    V::Err: std::error::Error + Send + Sync + 'static,
{
    let (key, value) = pair
        .rsplit_once(':')
        .with_context(|| format!("expected 'key:value', got '{pair}'"))?;
    let value = value
        .parse::<V>()
        .with_context(|| format!("invalid value in '{pair}'"))?;
    Ok((key.to_owned(), value))
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{parse_pair, Cli, Commands};

    #[test]
    fn pairs_split_on_last_colon() {
        let (key, value) = parse_pair::<String>("a:b:c").expect("must parse");
        assert_eq!(key, "a:b");
        assert_eq!(value, "c");

        let (key, value) = parse_pair::<i32>("n:-7").expect("must parse");
        assert_eq!((key.as_str(), value), ("n", -7));

        assert!(parse_pair::<i32>("novalue").is_err());
        assert!(parse_pair::<u32>("n:-1").is_err());
    }

    #[test]
    fn parses_negative_increment() {
        let cli = Cli::try_parse_from(["kvs-cli", "int-incr-by", "counter", "-3"])
            .expect("must parse");
        match cli.command {
            Commands::IntIncrBy { key, value } => {
                assert_eq!(key, "counter");
                assert_eq!(value, -3);
            }
            _ => panic!("expected int-incr-by"),
        }
        assert_eq!(cli.global.max_attempts, 5);
    }

    #[test]
    fn dict_names_reach_map_commands() {
        let cli = Cli::try_parse_from(["kvs-cli", "dict-put", "profile", "name=Jacob"])
            .expect("must parse");
        assert_eq!(cli.command.name(), "map-put");

        let cli = Cli::try_parse_from(["kvs-cli", "dict-get", "a"]).expect("must parse");
        assert_eq!(cli.command.name(), "map-get");

        let cli = Cli::try_parse_from(["kvs-cli", "dict-del", "a"]).expect("must parse");
        assert_eq!(cli.command.name(), "map-del");
    }

    #[test]
    fn parses_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "kvs-cli",
            "str-get",
            "a",
            "b",
            "--url",
            "http://kvs:9000",
            "--attempts",
            "2",
        ])
        .expect("must parse");
        assert_eq!(cli.global.url, "http://kvs:9000");
        assert_eq!(cli.global.max_attempts, 2);
        assert_eq!(cli.command.name(), "str-get");
    }
}

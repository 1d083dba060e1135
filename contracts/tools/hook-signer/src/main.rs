use std::{fs, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use alloy_primitives::{Address, B256};
use hook_account::{
    auth::{address_of, sign_hooks},
    eip712,
    registry::account_address,
    AccountShell,
};

mod calls;

use calls::read_calls;

/// Off-platform companion for hook accounts: compute account addresses and sign batches that a
/// relayer can later submit to the registry or the account.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the deterministic account address of an owner.
    Address {
        #[arg(long, env = "REGISTRY")]
        registry: Address,

        #[arg(long)]
        owner: Address,

        #[arg(long, value_enum, default_value_t = Shell::Delegating)]
        shell: Shell,
    },

    /// Sign a batch of calls and print the digest and both signature encodings as JSON.
    Sign {
        #[arg(long, env = "CHAIN_ID")]
        chain_id: u64,

        /// Account the batch is for. Derived from `--registry` and the signer when omitted.
        #[arg(long)]
        account: Option<Address>,

        #[arg(long, env = "REGISTRY")]
        registry: Option<Address>,

        #[arg(long, value_enum, default_value_t = Shell::Delegating)]
        shell: Shell,

        /// 32-byte nonce (0x-prefixed hex). Must not have been used by the account before.
        #[arg(long)]
        nonce: B256,

        /// JSON file with an array of `{ target, value, data, allowFailure }`.
        #[arg(long)]
        calls: PathBuf,

        /// Path to a file containing the signer private key.
        #[arg(long, env = "PRIV_KEY_PATH", conflicts_with = "private_key")]
        private_key_path: Option<PathBuf>,

        /// Private key (hex string, 0x...).
        #[arg(long, env = "PKEY", conflicts_with = "private_key_path")]
        private_key: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Shell {
    Delegating,
    Transparent,
}

impl From<Shell> for AccountShell {
    fn from(shell: Shell) -> Self {
        match shell {
            Shell::Delegating => AccountShell::delegating(),
            Shell::Transparent => AccountShell::transparent(),
        }
    }
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Address {
            registry,
            owner,
            shell,
        } => {
            let account = account_address(registry, owner, &shell.into());
            println!("{account}");
        }
        Command::Sign {
            chain_id,
            account,
            registry,
            shell,
            nonce,
            calls,
            private_key_path,
            private_key,
        } => {
            let key = load_key(private_key_path, private_key)?;
            let signer = address_of(key.verifying_key());
            let account = match (account, registry) {
                (Some(account), _) => account,
                (None, Some(registry)) => account_address(registry, signer, &shell.into()),
                (None, None) => return Err(anyhow!("provide --account or --registry")),
            };

            let calls = read_calls(&calls)?;
            debug!(%account, %signer, calls = calls.len(), "signing batch");
            let digest = eip712::hooks_digest(chain_id, account, &calls, nonce);
            let signature = sign_hooks(&key, chain_id, account, &calls, nonce)
                .map_err(|e| anyhow!("signing failed: {e}"))?;
            let (v, r, s) = signature
                .to_parts()
                .ok_or_else(|| anyhow!("signer produced a malformed signature"))?;
            let packed = signature
                .to_packed()
                .ok_or_else(|| anyhow!("signer produced a malformed signature"))?;

            let out = json!({
                "chainId": chain_id,
                "account": account,
                "owner": signer,
                "nonce": nonce,
                "digest": digest,
                "signature": packed,
                "v": v,
                "r": r,
                "s": s,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}

fn load_key(path: Option<PathBuf>, inline: Option<String>) -> Result<k256::ecdsa::SigningKey> {
    let raw = match (path, inline) {
        (Some(path), _) => fs::read_to_string(&path)
            .with_context(|| format!("failed to read key file {}", path.display()))?,
        (None, Some(key)) => key,
        (None, None) => {
            return Err(anyhow!(
                "missing signer key: provide --private-key-path or --private-key (or set PRIV_KEY_PATH/PKEY)"
            ))
        }
    };
    let trimmed = raw.trim();
    let bytes = hex::decode(trimmed.strip_prefix("0x").unwrap_or(trimmed))
        .context("private key is not valid hex")?;
    k256::ecdsa::SigningKey::from_slice(&bytes).map_err(|e| anyhow!("invalid private key: {e}"))
}

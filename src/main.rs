//! Wallet transaction CLI
//!
//! Developer harness for the signing core: build requests, simulate, sign,
//! broadcast and track transactions from the command line.

use alloy::primitives::{keccak256, Address, B256};
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use url::Url;
use wallet_tx_core::keystore::{encrypt_secret, Credential, PrivateKeyCredential};
use wallet_tx_core::network::{PredefinedNetworkName, TestNetworkName};
use wallet_tx_core::request::{builder, typed_data};
use wallet_tx_core::safety::{run_safety_checks, EthCallSimulator};
use wallet_tx_core::signer::{LocalSigner, SignedTransaction, UnavailableHardwareTransport};
use wallet_tx_core::submission::{self, SubmittedTransaction};
use wallet_tx_core::telemetry::{report_unexpected, ErrorReporter, TracingErrorReporter};
use wallet_tx_core::tokens::{self, CryptoCurrency, Money};
use wallet_tx_core::transport::{ReqwestHttpClient, RpcError};
use wallet_tx_core::{
    AbortController, AbortSignal, Config, Error, Network, NetworkRpcRoute, RawRequest, Result,
    RpcConfig, RpcDispatcher, SignedPayload, SignerDispatcher,
};

const SESSION_SECRET_ENV: &str = "WALLET_SESSION_SECRET";

#[derive(Parser)]
#[command(name = "wallet-tx")]
#[command(about = "Build, sign, broadcast and track EVM wallet transactions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Send RPC traffic to this node instead of the wallet proxy
    #[arg(long, global = true)]
    rpc_url: Option<Url>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in networks
    Networks,

    /// Build a transfer request (native or ERC-20)
    Transfer {
        #[arg(short, long, default_value = "ethereum", value_parser = parse_network)]
        network: Network,

        #[arg(long)]
        from: Address,

        #[arg(long)]
        to: Address,

        /// Human amount, e.g. "100" or "0.5"
        #[arg(long)]
        amount: String,

        /// Token symbol; the network's gas token when omitted
        #[arg(long)]
        token: Option<String>,
    },

    /// Build an ERC-20 approval request
    Approve {
        #[arg(short, long, default_value = "ethereum", value_parser = parse_network)]
        network: Network,

        #[arg(long)]
        from: Address,

        #[arg(long)]
        spender: Address,

        #[arg(long)]
        amount: String,

        #[arg(long)]
        token: String,
    },

    /// Print the EIP-712 hashes of a typed-data JSON file
    TypedData {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Send a raw JSON-RPC call
    Call {
        #[arg(short, long, default_value = "ethereum", value_parser = parse_network)]
        network: Network,

        /// Method name, e.g. eth_blockNumber
        method: String,

        /// Params as a JSON array
        #[arg(short = 'P', long)]
        params: Option<String>,
    },

    /// Run safety checks for a request file
    Simulate {
        #[arg(short, long, default_value = "ethereum", value_parser = parse_network)]
        network: Network,

        #[arg(short, long)]
        request: PathBuf,
    },

    /// Sign a request file with a credential file
    Sign {
        #[arg(short, long, default_value = "ethereum", value_parser = parse_network)]
        network: Network,

        #[arg(long)]
        credential: PathBuf,

        #[arg(short, long)]
        request: PathBuf,

        /// Fill in nonce, gas and fees from the node first
        #[arg(long)]
        prepare: bool,
    },

    /// Prepare, check, sign, broadcast and track a transaction
    Send {
        #[arg(short, long, default_value = "ethereum", value_parser = parse_network)]
        network: Network,

        #[arg(long)]
        credential: PathBuf,

        #[arg(short, long)]
        request: PathBuf,

        /// Return after broadcast instead of waiting for the outcome
        #[arg(long)]
        no_wait: bool,
    },

    /// Broadcast an already signed transaction
    Broadcast {
        #[arg(short, long, default_value = "ethereum", value_parser = parse_network)]
        network: Network,

        /// EIP-2718 encoded transaction (hex)
        raw: String,
    },

    /// Poll a transaction until it completes or fails
    Track {
        #[arg(short, long, default_value = "ethereum", value_parser = parse_network)]
        network: Network,

        hash: B256,
    },

    /// Explain why a mined transaction failed
    FailureReason {
        #[arg(short, long, default_value = "ethereum", value_parser = parse_network)]
        network: Network,

        hash: B256,
    },

    /// Seal a private key into a credential file
    Seal {
        /// Environment variable holding the hex private key
        #[arg(long, default_value = "WALLET_PRIVATE_KEY")]
        key_env: String,
    },

    /// Show current configuration
    Config,
}

fn parse_network(name: &str) -> std::result::Result<Network, String> {
    Network::from_catalog(name).ok_or_else(|| format!("unknown network {name:?}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let file_config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let config = RpcConfig::from_env()?.apply(file_config)?;
    let route = match cli.rpc_url {
        Some(url) => NetworkRpcRoute::custom(url),
        None => NetworkRpcRoute::default(),
    };

    let controller = AbortController::new();
    let signal = controller.signal();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Interrupted, cancelling");
                controller.abort();
            }
            Err(e) => {
                report_unexpected(&TracingErrorReporter, e, "ctrl-c handler");
            }
        }
    });

    match cli.command {
        Commands::Networks => list_networks(),
        Commands::Transfer {
            network,
            from,
            to,
            amount,
            token,
        } => {
            let currency = currency_for(&network, token.as_deref())?;
            let money = Money::from_decimal_str(&amount, currency)?;
            tracing::info!(amount = %money.formatted(), network = %network.display_name(), "Building transfer");
            print_json(&builder::transfer(&network, from, to, &money))?;
        }
        Commands::Approve {
            network,
            from,
            spender,
            amount,
            token,
        } => {
            let currency = currency_for(&network, Some(&token))?;
            let money = Money::from_decimal_str(&amount, currency)?;
            print_json(&builder::approve(from, spender, &money))?;
        }
        Commands::TypedData { file } => {
            let value: Value = read_json(&file)?;
            let envelope = typed_data::normalize(value)?;
            println!("primaryType:     {}", envelope.primary_type);
            println!("domainSeparator: {}", envelope.domain_separator()?);
            println!("structHash:      {}", envelope.struct_hash()?);
            println!("signingHash:     {}", envelope.signing_hash()?);
        }
        Commands::Call {
            network,
            method,
            params,
        } => {
            let params: Vec<Value> = match params {
                Some(raw) => serde_json::from_str(&raw)
                    .map_err(|e| Error::InvalidArgument(format!("params: {e}")))?,
                None => Vec::new(),
            };
            let dispatcher = rpc_dispatcher(&config)?;
            let result = dispatcher
                .call(&network, &route, &method, params, &signal)
                .await?;
            print_json(&result)?;
        }
        Commands::Simulate { network, request } => {
            let request: RawRequest = read_json(&request)?;
            let simulator = EthCallSimulator::new(Arc::new(rpc_dispatcher(&config)?));
            let result =
                run_safety_checks(&simulator, &network, &route, &request, &signal).await?;
            print_json(&result)?;
        }
        Commands::Sign {
            network,
            credential,
            request,
            prepare,
        } => {
            let credential: Credential = read_json(&credential)?;
            let mut request: RawRequest = read_json(&request)?;
            if prepare {
                let dispatcher = rpc_dispatcher(&config)?;
                request = prepared(&dispatcher, &network, &route, &request, &signal).await?;
            }
            let signed = sign(&config, &credential, &network, &request, &signal).await?;
            print_signed(&signed)?;
        }
        Commands::Send {
            network,
            credential,
            request,
            no_wait,
        } => {
            let credential: Credential = read_json(&credential)?;
            let request: RawRequest = read_json(&request)?;
            let shared = Arc::new(rpc_dispatcher(&config)?);
            let dispatcher = shared.as_ref();

            let request = prepared(dispatcher, &network, &route, &request, &signal).await?;
            let simulator = EthCallSimulator::new(shared.clone());
            let safety = run_safety_checks(&simulator, &network, &route, &request, &signal).await?;
            for check in safety.failed_checks() {
                tracing::warn!(check = ?check.kind, severity = ?check.severity, detail = ?check.detail, "Safety check failed");
            }

            let signed = match sign(&config, &credential, &network, &request, &signal).await? {
                SignedPayload::Transaction(signed) => signed,
                other => {
                    return Err(Error::InvalidArgument(format!(
                        "expected a transaction, got {:?}",
                        other.signature_hex()
                    )))
                }
            };
            let submitted =
                submission::submit(
                    dispatcher,
                    &network,
                    &route,
                    &signed,
                    &TracingErrorReporter,
                    &signal,
                )
                .await?;
            if no_wait {
                print_json(&submitted)?;
            } else {
                track(&config, dispatcher, &network, &route, submitted, &signal).await?;
            }
        }
        Commands::Broadcast { network, raw } => {
            let raw = alloy::hex::decode(raw.trim())
                .map_err(|e| Error::InvalidArgument(format!("raw transaction: {e}")))?;
            let signed = SignedTransaction {
                hash: keccak256(&raw),
                raw: raw.into(),
            };
            let dispatcher = rpc_dispatcher(&config)?;
            let submitted =
                submission::submit(
                    &dispatcher,
                    &network,
                    &route,
                    &signed,
                    &TracingErrorReporter,
                    &signal,
                )
                .await?;
            print_json(&submitted)?;
        }
        Commands::Track { network, hash } => {
            let dispatcher = rpc_dispatcher(&config)?;
            let queued = SubmittedTransaction::queued(hash, chrono::Utc::now());
            track(&config, &dispatcher, &network, &route, queued, &signal).await?;
        }
        Commands::FailureReason { network, hash } => {
            let dispatcher = rpc_dispatcher(&config)?;
            let reason =
                submission::fetch_failure_reason(&dispatcher, &network, &route, hash, &signal)
                    .await?;
            print_json(&reason)?;
        }
        Commands::Seal { key_env } => {
            let key = std::env::var(&key_env)
                .map_err(|_| Error::Config(format!("{key_env} is not set")))?;
            let signer = LocalSigner::from_hex(&key)?;
            let encrypted_key = encrypt_secret(&key, &session_secret()?)?;
            print_json(&Credential::PrivateKey(PrivateKeyCredential {
                address: signer.address(),
                encrypted_key,
            }))?;
        }
        Commands::Config => print_json(&config)?,
    }

    Ok(())
}

fn list_networks() {
    for name in PredefinedNetworkName::ALL {
        print_network(&Network::predefined(name));
    }
    for name in TestNetworkName::ALL {
        print_network(&Network::testnet(name));
    }
}

fn print_network(network: &Network) {
    println!(
        "{:<18} {:>10}  {:?}",
        network.display_name(),
        network.chain_id().to_decimal(),
        network.trx_type()
    );
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::InvalidArgument(format!("{}: {e}", path.display())))?;
    Ok(serde_json::from_str(&content)?)
}

fn session_secret() -> Result<SecretString> {
    std::env::var(SESSION_SECRET_ENV)
        .map(SecretString::from)
        .map_err(|_| Error::Config(format!("{SESSION_SECRET_ENV} is not set")))
}

fn currency_for(network: &Network, symbol: Option<&str>) -> Result<CryptoCurrency> {
    let chain_id = network.chain_id().0;
    let registry = tokens::registry();
    match symbol {
        Some(symbol) => registry.by_symbol(chain_id, symbol).cloned().ok_or_else(|| {
            Error::InvalidArgument(format!(
                "unknown token {symbol} on {}",
                network.display_name()
            ))
        }),
        None => Ok(registry
            .get(chain_id, &network.gas_token_address())
            .cloned()
            .unwrap_or_else(|| CryptoCurrency::token("ETH", 18, network.gas_token_address()))),
    }
}

fn rpc_dispatcher(config: &Config) -> Result<RpcDispatcher<ReqwestHttpClient>> {
    let http = ReqwestHttpClient::new(config.request_timeout())?;
    Ok(RpcDispatcher::new(http, &config.proxy_url()?)?)
}

async fn prepared(
    dispatcher: &RpcDispatcher<ReqwestHttpClient>,
    network: &Network,
    route: &NetworkRpcRoute,
    request: &RawRequest,
    signal: &AbortSignal,
) -> Result<RawRequest> {
    let preparation =
        submission::prepare_transaction(dispatcher, network, route, request, signal).await?;
    Ok(builder::with_preparation(request, &preparation)?)
}

async fn sign(
    config: &Config,
    credential: &Credential,
    network: &Network,
    request: &RawRequest,
    signal: &AbortSignal,
) -> Result<SignedPayload> {
    let signer = SignerDispatcher::new(UnavailableHardwareTransport, config.hardware_timeout());
    let secret = match credential {
        Credential::PrivateKey(_) | Credential::SecretPhrase(_) | Credential::SafeMultisig(_) => {
            session_secret()?
        }
        // Never opened for these
        Credential::Ledger(_) | Credential::Trezor(_) | Credential::TrackOnly(_) => {
            SecretString::from(String::new())
        }
    };
    Ok(signer
        .sign(credential, network, request, &secret, signal)
        .await?)
}

fn print_signed(signed: &SignedPayload) -> Result<()> {
    match signed {
        SignedPayload::Transaction(tx) => {
            println!("hash: {}", tx.hash);
            println!("raw:  {}", tx.raw);
        }
        SignedPayload::Signature(_) => {
            println!("signature: {}", signed.signature_hex().unwrap_or_default());
        }
        SignedPayload::SafeSignature { request, owner, .. } => {
            println!("owner:     {owner}");
            println!("signature: {}", signed.signature_hex().unwrap_or_default());
            print_json(request)?;
        }
    }
    Ok(())
}

async fn track(
    config: &Config,
    dispatcher: &RpcDispatcher<ReqwestHttpClient>,
    network: &Network,
    route: &NetworkRpcRoute,
    transaction: SubmittedTransaction,
    signal: &AbortSignal,
) -> Result<()> {
    let done = submission::poll_until_terminal(
        dispatcher,
        network,
        route,
        transaction,
        &config.poll_config(),
        &TracingErrorReporter,
        signal,
        |tx| println!("{:?} at block {:?}", tx.state, tx.block_number),
    )
    .await
    .map_err(RpcError::from)?;

    if done.state == wallet_tx_core::TransactionState::Failed {
        match submission::fetch_failure_reason(dispatcher, network, route, done.hash, signal).await
        {
            Ok(reason) => tracing::warn!(reason = ?reason, "Transaction failed"),
            Err(e) => TracingErrorReporter.report(&Error::Rpc(e), "failure classification"),
        }
    }
    print_json(&done)
}

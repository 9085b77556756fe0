// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use kubepki::{
    parse_cert_file, write_bundle, ClusterConfig, PkiOrchestrator, Result, SanKind,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kubepki")]
#[command(about = "Generate kubeadm-compatible PKI and kubeconfig files")]
#[command(version)]
#[command(after_help = "\
EXAMPLES:
    kubepki generate --api-server 10.0.0.5            # Full PKI into ./pki
    kubepki generate --api-server k8s.local --no-etcd # External etcd
    kubepki generate --config cluster.toml -o /etc/kubernetes
    kubepki inspect pki/ssl/apiserver.crt             # Show certificate details")]
struct Cli {
    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Show detailed output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate cluster certificates, keys and kubeconfig files
    Generate {
        /// Control-plane node IP or DNS name
        #[arg(long)]
        api_server: Option<String>,

        /// Cluster name used in kubeconfig files (default: kubernetes)
        #[arg(long)]
        cluster_name: Option<String>,

        /// Extra API server SANs, comma separated
        #[arg(long)]
        sans: Option<String>,

        /// Service network CIDR (default: 10.96.0.0/12)
        #[arg(long)]
        service_cidr: Option<String>,

        /// etcd member addresses, comma separated (default: the API server)
        #[arg(long)]
        etcd_servers: Option<String>,

        /// Days until leaf certificates expire (default: 3650)
        #[arg(long)]
        cert_days: Option<u32>,

        /// Days until authorities expire (default: 36500)
        #[arg(long)]
        ca_days: Option<u32>,

        /// Skip the etcd authority and certificates
        #[arg(long)]
        no_etcd: bool,

        /// Skip kubeconfig files
        #[arg(long)]
        no_kubeconfig: bool,

        /// Load settings from a TOML file; flags take precedence
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory
        #[arg(long, short, default_value = "pki")]
        output: PathBuf,

        /// Overwrite existing files
        #[arg(long, short)]
        force: bool,
    },

    /// Show details of a certificate file
    Inspect {
        /// PEM certificate to inspect
        file: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Output helper that respects --quiet and --verbose flags.
#[derive(Clone, Copy)]
struct Output {
    quiet: bool,
    verbose: bool,
}

impl Output {
    fn new(quiet: bool, verbose: bool) -> Self {
        Self { quiet, verbose }
    }

    /// Print a standard message (suppressed with --quiet)
    fn print(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }

    /// Print a verbose message (only shown with --verbose)
    fn verbose(&self, msg: &str) {
        if self.verbose {
            println!("{}", msg);
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    // Exit quietly on a closed pipe instead of panicking
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let out = Output::new(cli.quiet, cli.verbose);

    match cli.command {
        Commands::Generate {
            api_server,
            cluster_name,
            sans,
            service_cidr,
            etcd_servers,
            cert_days,
            ca_days,
            no_etcd,
            no_kubeconfig,
            config,
            output,
            force,
        } => {
            let mut cfg = match config {
                Some(path) => ClusterConfig::load(&path)?,
                None => ClusterConfig::default(),
            };

            if let Some(v) = api_server {
                cfg.api_server_address = v;
            }
            if let Some(v) = cluster_name {
                cfg.cluster_name = v;
            }
            if let Some(v) = sans {
                cfg.additional_sans = v;
            }
            if let Some(v) = service_cidr {
                cfg.service_cidr = v;
            }
            if let Some(v) = etcd_servers {
                cfg.etcd_servers = v;
            }
            if let Some(v) = cert_days {
                cfg.cert_days = v;
            }
            if let Some(v) = ca_days {
                cfg.ca_days = v;
            }
            if no_etcd {
                cfg.include_etcd = false;
            }
            if no_kubeconfig {
                cfg.include_kubeconfig = false;
            }

            cmd_generate(&cfg, &output, force, out)
        }
        Commands::Inspect { file } => cmd_inspect(&file),
        Commands::Completions { shell } => cmd_completions(shell),
    }
}

fn cmd_generate(config: &ClusterConfig, output: &Path, force: bool, out: Output) -> Result<()> {
    let bundle = PkiOrchestrator::new().generate(config)?;
    let written = write_bundle(output, &bundle.artifacts, force)?;

    for path in &written {
        out.verbose(&format!("  wrote {}", path.display()));
    }

    let summary = bundle.summary();
    out.print(&format!(
        "Generated {} files for cluster '{}' in {}",
        summary.total_files,
        config.cluster_name,
        output.display()
    ));
    out.print(&format!("  CA files:     {}", summary.ca_files));
    out.print(&format!("  Certificates: {}", summary.cert_files));
    out.print(&format!("  Keys:         {}", summary.key_files));
    out.print(&format!("  Kubeconfigs:  {}", summary.kubeconfig_files));

    Ok(())
}

fn cmd_inspect(path: &Path) -> Result<()> {
    let info = parse_cert_file(path)?;

    println!("Certificate: {}", path.display());
    println!("===========");
    println!();
    println!("Type:       {}", info.role());
    println!("Subject:    {}", info.subject);
    println!("Issuer:     {}", info.issuer);
    if let Some(org) = &info.organization {
        println!("Group:      {}", org);
    }
    println!("Serial:     {}", info.serial);

    if !info.subject_alt_names.is_empty() {
        println!("SANs:");
        for san in &info.subject_alt_names {
            let kind = match san.kind {
                SanKind::Dns => "DNS",
                SanKind::Ip => "IP",
            };
            println!("    - {}:{}", kind, san.value);
        }
    }

    println!();

    let days = info.days_remaining();
    if info.is_expired() {
        println!("Status:     EXPIRED ({} days ago)", -days);
    } else if days <= 30 {
        println!("Status:     Expiring soon ({} days)", days);
    } else {
        println!("Status:     Valid ({} days remaining)", days);
    }
    println!("Expires:    {}", info.expiry_string());

    Ok(())
}

fn cmd_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "kubepki", &mut std::io::stdout());
    Ok(())
}

//! Kubeship - container deployment to Kubernetes and OpenShift
//!
//! Usage:
//!   kubeship                  # Interactive deploy wizard (default)
//!   kubeship deploy ...       # Deploy with flags
//!   kubeship status <app>     # Show deployed resources
//!   kubeship config show      # Print merged configuration

mod interactive;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kubeship_core::apply::{ApplyGate, ApplyStatus, AutoApprove, NamespaceOutcome, RunResult};
use kubeship_core::cluster::{ClusterClient, KubeClusterClient, ResourceStatus};
use kubeship_core::commands::{
    DeployCommand, DeployOptions, DeployReport, StatusCommand, StatusOptions, StatusReport,
};
use kubeship_core::config::{
    ConfigScope, KubeconfigContext, KubeshipConfig, NamespaceContext, RawInputs, ValidationError,
    to_toml, validate_app_name, validate_namespace,
};
use kubeship_core::context::AppContext;

use crate::interactive::{InteractiveFlow, PromptGate};

/// Exit code for invalid input; the run never started
const EXIT_INVALID_INPUT: i32 = 2;

#[derive(Parser)]
#[command(name = "kubeship")]
#[command(about = "Render and apply container deployments", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render manifests and apply them to the cluster
    Deploy(Box<DeployArgs>),

    /// Show the cluster state of a deployed application
    Status {
        /// Application name (defaults to [defaults].app_name)
        name: Option<String>,

        /// Namespace (defaults to the active kubeconfig namespace)
        #[arg(long, short = 'n')]
        namespace: Option<String>,

        #[command(flatten)]
        routes: RouteArgs,

        /// Output format
        #[arg(short = 'o', long, default_value = "table")]
        format: OutputFormat,
    },

    /// Manage kubeship.toml
    Config(ConfigArgs),
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
    /// Only show problems (non-zero exit if any)
    Quiet,
}

#[derive(Args, Default)]
struct RouteArgs {
    /// Emit a route regardless of what the cluster reports
    #[arg(long, conflicts_with = "no_routes")]
    routes: bool,

    /// Never emit a route
    #[arg(long)]
    no_routes: bool,
}

impl RouteArgs {
    fn override_value(&self) -> Option<bool> {
        match (self.routes, self.no_routes) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Args, Default)]
struct DeployArgs {
    /// Application name
    #[arg(long)]
    name: Option<String>,
    /// Container image reference
    #[arg(long)]
    image: Option<String>,
    /// Target namespace
    #[arg(long, short = 'n')]
    namespace: Option<String>,
    /// Container port (1-65535)
    #[arg(long, short = 'p')]
    port: Option<String>,
    /// Replica count (at least 1)
    #[arg(long, short = 'r')]
    replicas: Option<String>,
    #[arg(long)]
    cpu_request: Option<String>,
    #[arg(long)]
    cpu_limit: Option<String>,
    #[arg(long)]
    memory_request: Option<String>,
    #[arg(long)]
    memory_limit: Option<String>,
    /// Directory the rendered manifests are written to
    #[arg(long, value_name = "DIR", conflicts_with = "no_write")]
    output_dir: Option<String>,
    /// Do not write manifests to disk
    #[arg(long)]
    no_write: bool,
    /// Interactive mode - prompts for missing options
    #[arg(short, long)]
    interactive: bool,
    /// Skip all confirmation prompts (for CI/CD)
    #[arg(short = 'y', long)]
    yes: bool,
    /// Ask before applying each manifest (interactive mode)
    #[arg(long)]
    confirm_each: bool,
    /// Render and write manifests without changing the cluster
    #[arg(long)]
    dry_run: bool,
    #[command(flatten)]
    routes: RouteArgs,
    /// Output format
    #[arg(short = 'o', long, default_value = "table")]
    format: OutputFormat,
}

impl DeployArgs {
    fn raw_inputs(&self) -> RawInputs {
        RawInputs {
            app_name: self.name.clone(),
            image: self.image.clone(),
            namespace: self.namespace.clone(),
            port: self.port.clone(),
            replicas: self.replicas.clone(),
            cpu_request: self.cpu_request.clone(),
            cpu_limit: self.cpu_limit.clone(),
            memory_request: self.memory_request.clone(),
            memory_limit: self.memory_limit.clone(),
            output_target: self.output_dir.clone(),
            skip_output: self.no_write,
        }
    }
}

#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Print the merged configuration
    Show {
        /// Output format
        #[arg(short = 'o', long, default_value = "table")]
        format: OutputFormat,
    },

    /// Write a kubeship.toml populated with the built-in defaults
    Init {
        /// Write the user-wide file instead of ./kubeship.toml
        #[arg(long, short = 'g')]
        global: bool,

        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },
}

fn main() {
    // Logs go to stderr so stdout stays parseable with --format json
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kubeship=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run_cli(cli.command) {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(exit_code_for(&err));
        }
    }
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<ValidationError>().is_some() {
        EXIT_INVALID_INPUT
    } else {
        1
    }
}

fn run_cli(command: Option<Commands>) -> Result<i32> {
    let ctx = AppContext::new(std::env::current_dir()?)?;

    match command {
        Some(Commands::Deploy(args)) => run_deploy(&ctx, *args),
        Some(Commands::Status {
            name,
            namespace,
            routes,
            format,
        }) => run_status(&ctx, name, namespace, &routes, format),
        Some(Commands::Config(args)) => run_config(&ctx, args),
        None => run_deploy(
            &ctx,
            DeployArgs {
                interactive: true,
                ..Default::default()
            },
        ),
    }
}

// =============================================================================
// Deploy
// =============================================================================

fn run_deploy(ctx: &AppContext, args: DeployArgs) -> Result<i32> {
    let config = ctx.load_config()?;
    let cmd = DeployCommand::from_config(&config);
    let namespace_context = KubeconfigContext;

    let mut inputs = args.raw_inputs();
    if args.interactive {
        let mut flow = InteractiveFlow::new(
            cmd.collector().defaults().clone(),
            inputs,
            namespace_context.active_namespace(),
            args.yes,
        );
        let result = flow.collect()?;
        if !result.confirmed {
            println!("Deployment cancelled.");
            return Ok(0);
        }
        inputs = result.inputs;
    }

    let mut options = DeployOptions::new(inputs).with_dry_run(args.dry_run);
    if let Some(routes) = args.routes.override_value() {
        options = options.with_routes(routes);
    }

    let report = if args.dry_run {
        // The cluster is only needed to probe for routes
        let client = connect_validated(&cmd, &options, &namespace_context, || {
            Ok(match options.routes {
                Some(_) => None,
                None => connect_for_probe(&config),
            })
        })?;
        cmd.dry_run(
            &options,
            &namespace_context,
            client.as_ref().map(|c| c as &dyn ClusterClient),
        )?
    } else {
        let client = connect_validated(&cmd, &options, &namespace_context, || {
            KubeClusterClient::connect(config.field_manager())
        })?;
        let mut gate: Box<dyn ApplyGate> = if args.interactive && !args.yes {
            Box::new(PromptGate::new(args.confirm_each))
        } else {
            Box::new(AutoApprove)
        };
        cmd.execute(&options, &namespace_context, &client, gate.as_mut())?
    };

    match args.format {
        OutputFormat::Table => print_deploy_table(&report)?,
        OutputFormat::Json => print_deploy_json(&report)?,
        OutputFormat::Quiet => print_deploy_quiet(&report),
    }

    Ok(report.exit_code())
}

/// Validates the inputs, then builds the cluster client. Invalid input is
/// reported as such even when no cluster is reachable.
fn connect_validated<C>(
    cmd: &DeployCommand,
    options: &DeployOptions,
    namespace_context: &dyn NamespaceContext,
    connect: impl FnOnce() -> Result<C>,
) -> Result<C> {
    cmd.collector().collect(&options.inputs, namespace_context)?;
    connect()
}

fn connect_for_probe(config: &KubeshipConfig) -> Option<KubeClusterClient> {
    match KubeClusterClient::connect(config.field_manager()) {
        Ok(client) => Some(client),
        Err(err) => {
            tracing::warn!(error = %err, "cluster unreachable, rendering without a route");
            None
        }
    }
}

fn print_deploy_table(report: &DeployReport) -> Result<()> {
    let spec = &report.spec;
    println!(
        "App: {}  Namespace: {}  Image: {}",
        spec.app_name(),
        spec.namespace(),
        spec.image_reference()
    );
    println!(
        "Routes: {}",
        if report.capabilities.supports_routes() {
            "yes"
        } else {
            "no"
        }
    );

    if report.written.is_empty() && report.is_dry_run() {
        println!();
        print!("{}", report.manifests.render()?);
    } else {
        for path in &report.written {
            println!("  wrote {}", path.display());
        }
    }
    println!("Fingerprint: {}", report.fingerprint);

    let Some(run) = &report.run else {
        println!();
        println!("Dry run: no changes made to the cluster.");
        return Ok(());
    };

    println!();
    println!("Namespace: {}", namespace_outcome(&run.namespace_outcome));
    println!("  {:<18} {:<11} {:<20} Status", "Step", "Kind", "Name");
    println!("  {}", "-".repeat(60));
    for step in &run.steps {
        println!(
            "  {:<18} {:<11} {:<20} {}",
            step.step.to_string(),
            step.kind.to_string(),
            truncate(&step.name, 20),
            status_symbol(step.status)
        );
        if let Some(message) = &step.message
            && step.status != ApplyStatus::Applied
        {
            println!("    {message}");
        }
    }

    for warning in &run.warnings {
        println!("  ⚠ {warning}");
    }

    println!();
    print_run_outcome(run);
    Ok(())
}

fn print_run_outcome(run: &RunResult) {
    match run.failure() {
        None if run.is_success() => println!("✓ Deployment applied"),
        None => println!("✗ Deployment incomplete"),
        Some(err) => println!("✗ {err}"),
    }
}

fn print_deploy_json(report: &DeployReport) -> Result<()> {
    let manifests = report
        .manifests
        .iter()
        .map(|m| m.to_json())
        .collect::<Result<Vec<_>, _>>()?;

    let output = serde_json::json!({
        "schema_version": 1,
        "spec": report.spec,
        "capabilities": report.capabilities,
        "labels": report.labels,
        "fingerprint": report.fingerprint,
        "written": report.written,
        "manifests": manifests,
        "run": report.run,
        "exit_code": report.exit_code(),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_deploy_quiet(report: &DeployReport) {
    for warning in report.warnings() {
        println!("{warning}");
    }
    if let Some(err) = report.run.as_ref().and_then(RunResult::failure) {
        println!("{err}");
    }
}

// =============================================================================
// Status
// =============================================================================

fn run_status(
    ctx: &AppContext,
    name: Option<String>,
    namespace: Option<String>,
    routes: &RouteArgs,
    format: OutputFormat,
) -> Result<i32> {
    let config = ctx.load_config()?;
    let options = status_options(name, namespace, routes, &config, &KubeconfigContext)?;

    let client = KubeClusterClient::connect(config.field_manager())?;
    let report = StatusCommand::new().execute(&options, &client)?;

    match format {
        OutputFormat::Table => print_status_table(&report),
        OutputFormat::Json => print_status_json(&report)?,
        OutputFormat::Quiet => {
            for resource in report.resources.iter().filter(|r| !is_healthy(r)) {
                println!("{} '{}' is not ready", resource.kind, resource.name);
            }
        }
    }

    Ok(if report.is_healthy() { 0 } else { 1 })
}

/// Resolves and validates the status target before any cluster client exists.
fn status_options(
    name: Option<String>,
    namespace: Option<String>,
    routes: &RouteArgs,
    config: &KubeshipConfig,
    namespace_context: &dyn NamespaceContext,
) -> Result<StatusOptions, ValidationError> {
    let name = name
        .or_else(|| config.defaults.app_name.clone())
        .ok_or(ValidationError::MissingRequiredField("appName"))?;
    let namespace = namespace
        .or_else(|| namespace_context.active_namespace())
        .or_else(|| config.defaults.namespace.clone())
        .unwrap_or_else(|| kubeship_core::config::collector::DEFAULT_NAMESPACE.to_string());
    validate_app_name(&name)?;
    validate_namespace(&namespace)?;

    let mut options = StatusOptions::new(name, namespace);
    if let Some(routes) = routes.override_value() {
        options = options.with_routes(routes);
    }
    Ok(options)
}

fn is_healthy(resource: &ResourceStatus) -> bool {
    resource.exists && resource.ready != Some(false)
}

fn print_status_table(report: &StatusReport) {
    println!("App: {}  Namespace: {}", report.app_name, report.namespace);
    println!();
    println!("  {:<11} {:<20} {:<8} Summary", "Kind", "Name", "Ready");
    println!("  {}", "-".repeat(60));
    for resource in &report.resources {
        let ready = match (resource.exists, resource.ready) {
            (false, _) => "missing",
            (true, Some(true)) => "yes",
            (true, Some(false)) => "no",
            (true, None) => "-",
        };
        println!(
            "  {:<11} {:<20} {:<8} {}",
            resource.kind.to_string(),
            truncate(&resource.name, 20),
            ready,
            resource.summary.as_deref().unwrap_or("-")
        );
    }
}

fn print_status_json(report: &StatusReport) -> Result<()> {
    let output = serde_json::json!({
        "schema_version": 1,
        "app_name": report.app_name,
        "namespace": report.namespace,
        "healthy": report.is_healthy(),
        "resources": report.resources,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

// =============================================================================
// Config
// =============================================================================

fn run_config(ctx: &AppContext, args: ConfigArgs) -> Result<i32> {
    match args.command {
        ConfigSubcommand::Show { format } => {
            let config = ctx.load_config()?;
            match format {
                OutputFormat::Table => print!("{}", to_toml(&config)?),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
                OutputFormat::Quiet => {}
            }
        }
        ConfigSubcommand::Init { global, force } => {
            let scope = if global {
                ConfigScope::Global
            } else {
                ConfigScope::Project
            };
            let store = ctx.config_store(scope);
            if store.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    store.config_path().display()
                );
            }
            store.save(&KubeshipConfig::builtin())?;
            println!("✓ Wrote {}", store.config_path().display());
        }
    }
    Ok(0)
}

// =============================================================================
// Helpers
// =============================================================================

fn namespace_outcome(outcome: &NamespaceOutcome) -> String {
    match outcome {
        NamespaceOutcome::NotChecked => "not checked".to_string(),
        NamespaceOutcome::Existing => "exists".to_string(),
        NamespaceOutcome::Created => "created".to_string(),
        NamespaceOutcome::Declined => "creation declined".to_string(),
        NamespaceOutcome::Failed(message) => format!("failed ({message})"),
    }
}

fn status_symbol(status: ApplyStatus) -> &'static str {
    match status {
        ApplyStatus::Applied => "✓ applied",
        ApplyStatus::Failed => "✗ failed",
        ApplyStatus::Skipped => "- skipped",
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use kubeship_core::config::FixedNamespace;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args.iter().copied()).unwrap()
    }

    #[test]
    fn no_subcommand_parses() {
        let cli = parse(&["kubeship"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn deploy_flags_map_to_raw_inputs() {
        let cli = parse(&[
            "kubeship",
            "deploy",
            "--name",
            "demo",
            "--image",
            "nginx:1.27",
            "-n",
            "apps",
            "--port",
            "8081",
            "--replicas",
            "3",
            "--output-dir",
            "out",
        ]);
        let Some(Commands::Deploy(args)) = cli.command else {
            panic!("expected deploy");
        };
        let inputs = args.raw_inputs();
        assert_eq!(inputs.app_name.as_deref(), Some("demo"));
        assert_eq!(inputs.image.as_deref(), Some("nginx:1.27"));
        assert_eq!(inputs.namespace.as_deref(), Some("apps"));
        assert_eq!(inputs.port.as_deref(), Some("8081"));
        assert_eq!(inputs.replicas.as_deref(), Some("3"));
        assert_eq!(inputs.output_target.as_deref(), Some("out"));
        assert!(!inputs.skip_output);
    }

    #[test]
    fn deploy_route_overrides() {
        let cli = parse(&["kubeship", "deploy", "--dry-run", "--no-routes"]);
        let Some(Commands::Deploy(args)) = cli.command else {
            panic!("expected deploy");
        };
        assert!(args.dry_run);
        assert_eq!(args.routes.override_value(), Some(false));

        let cli = parse(&["kubeship", "deploy", "--routes"]);
        let Some(Commands::Deploy(args)) = cli.command else {
            panic!("expected deploy");
        };
        assert_eq!(args.routes.override_value(), Some(true));
    }

    #[test]
    fn routes_and_no_routes_conflict() {
        let result = Cli::try_parse_from(["kubeship", "deploy", "--routes", "--no-routes"]);
        assert!(result.is_err());
    }

    #[test]
    fn output_dir_and_no_write_conflict() {
        let result =
            Cli::try_parse_from(["kubeship", "deploy", "--output-dir", "out", "--no-write"]);
        assert!(result.is_err());
    }

    #[test]
    fn deploy_with_format_json_parses() {
        let cli = parse(&["kubeship", "deploy", "-y", "-o", "json"]);
        let Some(Commands::Deploy(args)) = cli.command else {
            panic!("expected deploy");
        };
        assert!(args.yes);
        assert!(matches!(args.format, OutputFormat::Json));
    }

    #[test]
    fn status_parses() {
        let cli = parse(&["kubeship", "status", "demo", "-n", "apps", "-o", "quiet"]);
        let Some(Commands::Status {
            name, namespace, ..
        }) = cli.command
        else {
            panic!("expected status");
        };
        assert_eq!(name.as_deref(), Some("demo"));
        assert_eq!(namespace.as_deref(), Some("apps"));
    }

    #[test]
    fn config_init_parses() {
        let cli = parse(&["kubeship", "config", "init", "--global", "--force"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Config(ConfigArgs {
                command: ConfigSubcommand::Init {
                    global: true,
                    force: true
                }
            }))
        ));
    }

    #[test]
    fn validation_errors_exit_with_invalid_input_code() {
        let err = anyhow::Error::new(ValidationError::InvalidPort("0".to_string()));
        assert_eq!(exit_code_for(&err), EXIT_INVALID_INPUT);
        assert_eq!(exit_code_for(&anyhow::anyhow!("boom")), 1);
    }

    fn invalid_port_args() -> DeployArgs {
        let cli = parse(&[
            "kubeship", "deploy", "--name", "demo", "--image", "nginx", "--port", "0", "-y",
        ]);
        let Some(Commands::Deploy(args)) = cli.command else {
            panic!("expected deploy");
        };
        *args
    }

    #[test]
    fn invalid_input_is_reported_before_connecting() {
        let args = invalid_port_args();
        let cmd = DeployCommand::new();
        let options = DeployOptions::new(args.raw_inputs());
        let mut connected = false;

        let err = connect_validated(&cmd, &options, &FixedNamespace::none(), || {
            connected = true;
            Err::<(), _>(anyhow::anyhow!("Failed to create cluster client"))
        })
        .unwrap_err();

        assert!(!connected);
        assert_eq!(exit_code_for(&err), EXIT_INVALID_INPUT);
        assert!(err.to_string().contains("invalid container port '0'"));
    }

    #[test]
    fn valid_input_reaches_the_connect_step() {
        let cli = parse(&["kubeship", "deploy", "--name", "demo", "--image", "nginx", "-y"]);
        let Some(Commands::Deploy(args)) = cli.command else {
            panic!("expected deploy");
        };
        let options = DeployOptions::new(args.raw_inputs());

        let err = connect_validated(&DeployCommand::new(), &options, &FixedNamespace::none(), || {
            Err::<(), _>(anyhow::anyhow!("no kubeconfig"))
        })
        .unwrap_err();

        assert_eq!(exit_code_for(&err), 1);
    }

    #[test]
    fn status_target_is_validated_before_connecting() {
        let config = KubeshipConfig::new();
        let routes = RouteArgs::default();

        let err = status_options(
            Some("1demo".to_string()),
            None,
            &routes,
            &config,
            &FixedNamespace::none(),
        )
        .unwrap_err();
        assert_eq!(exit_code_for(&anyhow::Error::new(err)), EXIT_INVALID_INPUT);

        let options = status_options(
            Some("demo".to_string()),
            None,
            &routes,
            &config,
            &FixedNamespace::active("apps"),
        )
        .unwrap();
        assert_eq!(options.namespace, "apps");
    }

    #[test]
    fn truncate_long_names() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 5), "abcd…");
    }
}

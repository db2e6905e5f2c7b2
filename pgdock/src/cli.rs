use anyhow::{bail, Result};
use clap::{CommandFactory, Parser, ValueEnum};
use pgdock_core::{
    env::DEFAULT_HOST_AUTH_METHOD,
    parse_volume_tokens,
    postgres::DEFAULT_HOST_PORT,
    Config, DockerCli, EventLog, PostgresController, PostgresEnv, StartOptions, StopOptions,
};

const BUILD: &str = concat!(
    "pgdock ",
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("CARGO_GIT_SHA"),
    ")"
);

/// `PGDATA` used by the CLI: a subdirectory of the image's data volume, so a
/// host bind on the volume root never shadows the cluster directory.
const CLI_PGDATA: &str = "/var/lib/postgresql/data/pgdata";

/// Single-dash multi-letter flags accepted for compatibility, with the long
/// flag each stands for.
const LEGACY_FLAGS: &[(&str, &str)] = &[
    ("-vs", "--version"),
    ("-pwd", "--postgres_password"),
    ("-usr", "--postgres_user"),
    ("-db", "--postgres_db"),
    ("-mv", "--mount-volume"),
    ("-rs", "--restart-if-exists"),
];

/// Flags whose next token is a value and must not be rewritten.
const VALUE_FLAGS: &[&str] = &[
    "--version",
    "--name",
    "-n",
    "--postgres_password",
    "--postgres_user",
    "--postgres_db",
    "--port",
    "-p",
    "--pgdata",
    "--initdb-args",
    "--initdb-waldir",
    "--host-auth-method",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
    /// Print this help
    Help,
    /// Make sure the image is present locally
    Pull,
    /// Start a container (or reuse the one with the same name)
    Start,
    /// Stop a named container
    Stop,
}

#[derive(Debug, Parser)]
#[command(
    name = "pgdock",
    about = "Utilities to set up postgres in docker containers.",
    after_help = BUILD,
    disable_version_flag = true
)]
pub struct Cli {
    /// Action to run
    #[arg(value_enum, default_value_t = Action::Help)]
    pub action: Action,

    /// Postgres image tag, e.g. 10-alpine
    #[arg(long = "version", default_value = "latest", value_name = "TAG")]
    pub tag: String,

    /// Container name. Assigned by the engine when omitted
    #[arg(short = 'n', long)]
    pub name: Option<String>,

    /// POSTGRES_PASSWORD
    #[arg(long = "postgres_password", default_value = "bad_password")]
    pub password: String,

    /// POSTGRES_USER
    #[arg(long = "postgres_user", default_value = "postgres")]
    pub user: String,

    /// POSTGRES_DB
    #[arg(long = "postgres_db", default_value = "postgres")]
    pub db: String,

    /// Host port forwarded to the container's 5432
    #[arg(short = 'p', long, default_value_t = DEFAULT_HOST_PORT)]
    pub port: u16,

    /// Bind mounts as HOST:CONTAINER; tokens without a colon are ignored
    #[arg(long = "mount-volume", num_args = 0.., value_name = "HOST:CONTAINER")]
    pub volumes: Vec<String>,

    /// Print diagnostics
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Restart the container if one with --name already exists
    #[arg(long = "restart-if-exists")]
    pub restart_if_exists: bool,

    /// PGDATA inside the container; the directory wiped by stop --remove-data
    #[arg(long, default_value = CLI_PGDATA)]
    pub pgdata: String,

    /// POSTGRES_INITDB_ARGS
    #[arg(long = "initdb-args")]
    pub initdb_args: Option<String>,

    /// POSTGRES_INITDB_WALDIR
    #[arg(long = "initdb-waldir")]
    pub initdb_waldir: Option<String>,

    /// POSTGRES_HOST_AUTH_METHOD
    #[arg(long = "host-auth-method", default_value = DEFAULT_HOST_AUTH_METHOD)]
    pub host_auth_method: String,

    /// stop: remove the container after stopping it
    #[arg(long)]
    pub remove: bool,

    /// stop: delete the data directory inside the container and the host volumes
    #[arg(long = "remove-data")]
    pub remove_data: bool,
}

/// Rewrite legacy single-dash flags (`-vs 10-alpine`, `-db=app`) to their
/// long forms. Values of other flags and everything after `--` are untouched.
pub fn normalize_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out = Vec::new();
    let mut expect_value = false;
    let mut passthrough = false;

    for arg in args {
        if passthrough || expect_value {
            expect_value = false;
            out.push(arg);
            continue;
        }
        if arg == "--" {
            passthrough = true;
            out.push(arg);
            continue;
        }

        let (flag, value) = match arg.split_once('=') {
            Some((f, v)) => (f, Some(v)),
            None => (arg.as_str(), None),
        };
        let long = LEGACY_FLAGS
            .iter()
            .find(|(short, _)| *short == flag)
            .map(|(_, long)| *long);
        expect_value = value.is_none() && VALUE_FLAGS.contains(&long.unwrap_or(flag));

        let rewritten = long.map(|long| match value {
            Some(v) => format!("{long}={v}"),
            None => long.to_string(),
        });
        out.push(rewritten.unwrap_or(arg));
    }
    out
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.action {
        Action::Help => {
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
        Action::Pull => {
            controller()?.pull(&cli.tag, cli.verbose)?;
            Ok(())
        }
        Action::Start => {
            controller()?.start(&start_options(&cli))?;
            Ok(())
        }
        Action::Stop => {
            let opts = stop_options(&cli)?;
            controller()?.stop(&opts)?;
            Ok(())
        }
    }
}

fn controller() -> Result<PostgresController<DockerCli>> {
    let config = Config::load()?;
    let engine = DockerCli::new(config.docker_bin.as_str());
    let events = EventLog::open(&config.logs_dir());
    Ok(PostgresController::new(engine, &config, events))
}

fn start_options(cli: &Cli) -> StartOptions {
    StartOptions {
        version: cli.tag.clone(),
        name: cli.name.clone(),
        env: PostgresEnv {
            password: Some(cli.password.clone()),
            user: Some(cli.user.clone()),
            db: Some(cli.db.clone()),
            initdb_args: cli.initdb_args.clone(),
            initdb_waldir: cli.initdb_waldir.clone(),
            host_auth_method: Some(cli.host_auth_method.clone()),
            pgdata: Some(cli.pgdata.clone()),
        },
        volumes: parse_volume_tokens(&cli.volumes),
        port: cli.port,
        verbose: cli.verbose,
        restart_if_exists: cli.restart_if_exists,
    }
}

fn stop_options(cli: &Cli) -> Result<StopOptions> {
    let Some(name) = &cli.name else {
        bail!("stop requires --name");
    };
    Ok(StopOptions {
        name: name.clone(),
        pgdata: cli.pgdata.clone(),
        volumes: parse_volume_tokens(&cli.volumes),
        remove: cli.remove,
        remove_data: cli.remove_data,
        verbose: cli.verbose,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgdock_core::env::DEFAULT_PGDATA;
    use std::path::Path;

    fn argv(line: &str) -> Vec<String> {
        std::iter::once("pgdock")
            .chain(line.split_whitespace())
            .map(String::from)
            .collect()
    }

    fn parse(line: &str) -> Cli {
        Cli::try_parse_from(normalize_args(argv(line))).unwrap()
    }

    // ── normalize_args ───────────────────────────────────────────────────────

    #[test]
    fn normalize_rewrites_legacy_flags() {
        assert_eq!(
            normalize_args(argv("start -vs 10-alpine -pwd pw -usr u -db d -mv /a:/b -rs")),
            argv(
                "start --version 10-alpine --postgres_password pw --postgres_user u \
                 --postgres_db d --mount-volume /a:/b --restart-if-exists"
            )
        );
    }

    #[test]
    fn normalize_rewrites_equals_form() {
        assert_eq!(
            normalize_args(argv("pull -vs=11-alpine")),
            argv("pull --version=11-alpine")
        );
    }

    #[test]
    fn normalize_leaves_flag_values_alone() {
        // A password that happens to look like a legacy flag stays a value.
        assert_eq!(
            normalize_args(argv("start --postgres_password -db -pwd -rs")),
            argv("start --postgres_password -db --postgres_password -rs")
        );
    }

    #[test]
    fn normalize_stops_at_double_dash() {
        assert_eq!(normalize_args(argv("start -- -vs")), argv("start -- -vs"));
    }

    // ── clap parsing ─────────────────────────────────────────────────────────

    #[test]
    fn parse_no_args_is_help() {
        assert_eq!(parse("").action, Action::Help);
    }

    #[test]
    fn parse_every_action() {
        assert_eq!(parse("help").action, Action::Help);
        assert_eq!(parse("pull").action, Action::Pull);
        assert_eq!(parse("start").action, Action::Start);
        assert_eq!(parse("stop").action, Action::Stop);
    }

    #[test]
    fn parse_unknown_action_fails() {
        assert!(Cli::try_parse_from(argv("restart")).is_err());
    }

    #[test]
    fn parse_defaults() {
        let cli = parse("start");
        assert_eq!(cli.tag, "latest");
        assert_eq!(cli.name, None);
        assert_eq!(cli.password, "bad_password");
        assert_eq!(cli.user, "postgres");
        assert_eq!(cli.db, "postgres");
        assert_eq!(cli.port, 5432);
        assert!(cli.volumes.is_empty());
        assert!(!cli.verbose);
        assert!(!cli.restart_if_exists);
        assert_eq!(cli.pgdata, "/var/lib/postgresql/data/pgdata");
        assert_eq!(cli.host_auth_method, "password");
    }

    #[test]
    fn parse_pull_with_version() {
        let cli = parse("pull -vs 11-alpine");
        assert_eq!(cli.action, Action::Pull);
        assert_eq!(cli.tag, "11-alpine");
    }

    #[test]
    fn parse_start_scenario() {
        let cli = parse(
            "start -vs 10-alpine -n mypg -p 5006 --mount-volume /host/pg:/var/lib/postgresql/data",
        );
        assert_eq!(cli.action, Action::Start);
        assert_eq!(cli.tag, "10-alpine");
        assert_eq!(cli.name.as_deref(), Some("mypg"));
        assert_eq!(cli.port, 5006);
        assert_eq!(cli.volumes, vec!["/host/pg:/var/lib/postgresql/data"]);
    }

    #[test]
    fn parse_multiple_volumes() {
        let cli = parse("start -v -mv /a:/b /c:/d nocolon -rs");
        assert_eq!(cli.volumes, vec!["/a:/b", "/c:/d", "nocolon"]);
        assert!(cli.verbose);
        assert!(cli.restart_if_exists);
    }

    #[test]
    fn parse_rejects_non_numeric_port() {
        assert!(Cli::try_parse_from(argv("start -p abc")).is_err());
    }

    #[test]
    fn parse_stop_flags() {
        let cli = parse("stop -n mypg --remove --remove-data");
        assert_eq!(cli.action, Action::Stop);
        assert!(cli.remove);
        assert!(cli.remove_data);
    }

    // ── parameter translation ────────────────────────────────────────────────

    #[test]
    fn start_options_translate_flags() {
        let cli = parse("start -vs 10-alpine -n mypg -p 5006 -pwd pw -mv /a:/b nocolon");
        let opts = start_options(&cli);
        assert_eq!(opts.version, "10-alpine");
        assert_eq!(opts.name.as_deref(), Some("mypg"));
        assert_eq!(opts.port, 5006);
        assert_eq!(opts.env.password.as_deref(), Some("pw"));
        assert_eq!(opts.env.initdb_args, None);
        assert_eq!(opts.env.pgdata.as_deref(), Some("/var/lib/postgresql/data/pgdata"));
        assert_eq!(opts.volumes.len(), 1);
        assert_eq!(opts.volumes[Path::new("/a")], "/b");
    }

    #[test]
    fn start_options_do_not_share_volume_maps() {
        let with = start_options(&parse("start -mv /a:/b"));
        let without = start_options(&parse("start"));
        assert_eq!(with.volumes.len(), 1);
        assert!(without.volumes.is_empty());
    }

    #[test]
    fn stop_options_require_name() {
        let err = stop_options(&parse("stop")).unwrap_err();
        assert!(err.to_string().contains("--name"));
    }

    #[test]
    fn stop_options_translate_flags() {
        let opts = stop_options(&parse("stop -n mypg --remove-data -mv /a:/b")).unwrap();
        assert_eq!(opts.name, "mypg");
        assert!(opts.remove_data);
        assert!(!opts.remove);
        assert_eq!(opts.pgdata, "/var/lib/postgresql/data/pgdata");
        assert_eq!(opts.volumes[Path::new("/a")], "/b");
    }

    #[test]
    fn library_pgdata_default_differs_from_cli() {
        assert_ne!(CLI_PGDATA, DEFAULT_PGDATA);
        assert!(CLI_PGDATA.starts_with(DEFAULT_PGDATA));
    }

    // ── routing ──────────────────────────────────────────────────────────────

    #[test]
    fn route_help_succeeds_without_docker() {
        assert!(run(parse("help")).is_ok());
    }

    #[test]
    fn route_stop_without_name_fails_before_docker() {
        let err = run(parse("stop")).unwrap_err();
        assert!(format!("{err:#}").contains("stop requires --name"));
    }
}

//! CLI argument definitions using clap derive macros.

use std::fmt;
use std::path::PathBuf;

use clap::Parser;

/// Upload a build artifact to App Center and distribute it to tester groups.
///
/// Opens a release upload, sends the artifact in chunks, waits for the service
/// to process it and assigns the resulting release to the given groups.
#[derive(Parser)]
#[command(name = "appcenter-upload")]
#[command(author, version, about)]
pub struct Args {
    /// API token used to authenticate against the service
    #[arg(long, env = "APPCENTER_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Owner (user or organization) of the app
    #[arg(long)]
    pub owner: Option<String>,

    /// App name as known to the service
    #[arg(long)]
    pub app: Option<String>,

    /// Distribution groups, separated by commas or newlines
    #[arg(long)]
    pub groups: Option<String>,

    /// Path to the artifact (.apk, .aab, .ipa, ...)
    #[arg(long)]
    pub path: Option<String>,

    /// Release notes shown to testers
    #[arg(long)]
    pub release_notes: Option<String>,

    /// Notify testers about the new release (default)
    #[arg(long, overrides_with = "no_notify")]
    pub notify_testers: bool,

    /// Do not notify testers about the new release
    #[arg(long, overrides_with = "notify_testers")]
    pub no_notify: bool,

    /// Service base URL (overrides the config file)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Forward proxy host
    #[arg(long)]
    pub proxy_host: Option<String>,

    /// Forward proxy port
    #[arg(long, requires = "proxy_host", value_parser = clap::value_parser!(u16).range(1..))]
    pub proxy_port: Option<u16>,

    /// Forward proxy user
    #[arg(long, requires = "proxy_host")]
    pub proxy_user: Option<String>,

    /// Forward proxy password (used with --proxy-user)
    #[arg(long, env = "APPCENTER_PROXY_PASSWORD", hide_env_values = true)]
    pub proxy_password: Option<String>,

    /// Config file with tuning defaults
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Whether testers should be notified; the last of the two flags wins.
    #[must_use]
    pub fn notify(&self) -> bool {
        !self.no_notify
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("Args")
            .field("api_token", &redact(&self.api_token))
            .field("owner", &self.owner)
            .field("app", &self.app)
            .field("groups", &self.groups)
            .field("path", &self.path)
            .field("release_notes", &self.release_notes)
            .field("notify", &self.notify())
            .field("base_url", &self.base_url)
            .field("proxy_host", &self.proxy_host)
            .field("proxy_port", &self.proxy_port)
            .field("proxy_user", &self.proxy_user)
            .field("proxy_password", &redact(&self.proxy_password))
            .field("config", &self.config)
            .field("verbose", &self.verbose)
            .field("quiet", &self.quiet)
            .finish()
    }
}

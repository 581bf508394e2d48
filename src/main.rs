use clap::{Args, Parser, Subcommand};
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

use git_webrev::config::{Config, ProcessDefaults};
use git_webrev::integrate::generate::ExternalGenerator;
use git_webrev::integrate::{self, FetchRequest, GenerateOptions};
use git_webrev::repo::GitRepository;
use git_webrev::report;
use git_webrev::webrev::HttpWebrevClient;

/// Generate a webrev, or bring a published webrev's patch into
/// the local repository.
#[derive(Parser, Debug)]
#[command(name = "git-webrev", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a webrev (default)
    Generate(GenerateArgs),
    /// Apply a webrev from a webrev url to the working copy
    Apply {
        /// Webrev url
        url: String,
    },
    /// Apply a webrev as a commit to a separate branch
    Fetch {
        /// Webrev url
        url: String,

        /// Name of the branch to create (default is WEBREV_FETCH_HEAD)
        #[arg(short, long)]
        branch: Option<String>,

        /// Ref to which to apply this webrev
        #[arg(long = "ref", value_name = "REFSPEC")]
        reference: Option<String>,
    },
    /// Print the metadata of a webrev
    Show {
        /// Webrev url
        url: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Default)]
struct GenerateArgs {
    /// Compare against a specified revision
    #[arg(short, long, value_name = "REV")]
    rev: Option<String>,

    /// Output directory
    #[arg(short, long, value_name = "DIR")]
    output: Option<String>,

    /// Use that username instead of 'guessing' one
    #[arg(short, long, value_name = "NAME")]
    username: Option<String>,

    /// The URL to the upstream repository
    #[arg(long, value_name = "URL")]
    repository: Option<String>,

    /// The title of the webrev
    #[arg(short, long)]
    title: Option<String>,

    /// Include link to CR (aka bugid) in the main page
    #[arg(short, long, value_name = "CR#")]
    cr: Option<String>,

    /// Do not compare against remote, use only 'status'
    #[arg(short = 'N', long)]
    no_outgoing: bool,
}

impl From<GenerateArgs> for GenerateOptions {
    fn from(args: GenerateArgs) -> Self {
        GenerateOptions {
            rev: args.rev,
            output: args.output,
            username: args.username,
            repository: args.repository,
            title: args.title,
            cr: args.cr,
            no_outgoing: args.no_outgoing,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = Config::load()?;
    let defaults = ProcessDefaults::from_env()?;

    match cli.command.unwrap_or(Commands::Generate(GenerateArgs::default())) {
        Commands::Generate(args) => {
            let _span = info_span!("webrev", op = "generate").entered();
            let repo = open_repository(&defaults)?;
            let generator = ExternalGenerator::new(config.generator(), repo.root());
            let plan = integrate::generate(
                &args.into(),
                &repo,
                &generator,
                &config,
                &defaults,
            )?;
            report::print_generate(&plan);
        }
        Commands::Apply { url } => {
            let _span = info_span!("webrev", op = "apply", url = %url).entered();
            let repo = open_repository(&defaults)?;
            let client = HttpWebrevClient::new(&config.user_agent())?;
            let outcome = integrate::apply(&client, &repo, &url).await?;
            report::print_apply(&outcome);
        }
        Commands::Fetch {
            url,
            branch,
            reference,
        } => {
            let _span = info_span!("webrev", op = "fetch", url = %url).entered();
            let repo = open_repository(&defaults)?;
            let client = HttpWebrevClient::new(&config.user_agent())?;
            let request = FetchRequest {
                location: &url,
                branch: branch.as_deref().unwrap_or(config.fetch_branch()),
                override_ref: reference.as_deref(),
            };
            let outcome = integrate::fetch(&client, &repo, &request).await?;
            report::print_fetch(&outcome);
        }
        Commands::Show { url, json } => {
            let _span = info_span!("webrev", op = "show", url = %url).entered();
            let client = HttpWebrevClient::new(&config.user_agent())?;
            let metadata = integrate::show(&client, &url).await?;
            if json {
                println!("{}", report::metadata_json(&metadata)?);
            } else {
                report::print_metadata(&metadata);
            }
        }
    }

    info!("done");
    Ok(())
}

fn open_repository(defaults: &ProcessDefaults) -> Result<GitRepository, Box<dyn std::error::Error>> {
    let repo = GitRepository::discover(&defaults.cwd)?;
    debug!(root = %repo.root().display(), "found repository");
    Ok(repo)
}

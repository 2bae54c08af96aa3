use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use claims_client::Route;

/// Insurance claims portal in the terminal
#[derive(Parser, Debug)]
#[command(name = "claims-portal")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Backend base URL including the /api prefix (overrides CLAIMS_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// File holding the persisted session token (overrides CLAIMS_TOKEN_FILE)
    #[arg(long, global = true)]
    pub token_file: Option<PathBuf>,

    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    // === Session ===
    /// Sign in and persist the session token
    Login {
        email: String,

        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Create an account (sign in separately afterwards)
    Register(RegisterArgs),

    /// Forget the persisted session
    Logout,

    /// Show who is signed in
    Whoami,

    // === Claims ===
    /// Claim totals and the most recent claims
    Dashboard,

    /// List claims visible to the signed-in role
    #[command(alias = "ls")]
    Claims {
        /// ALL, SUBMITTED, IN_REVIEW, APPROVED or REJECTED
        #[arg(long, default_value = "ALL")]
        status: String,

        /// Page number (agents and admins; paginated listing)
        #[arg(long)]
        page: Option<u32>,

        /// Page size
        #[arg(long)]
        size: Option<u32>,

        /// Re-fetch every N seconds until interrupted
        #[arg(long, value_name = "SECS")]
        watch: Option<u64>,
    },

    /// Open a claim with its documents and fraud verdict
    Show { id: i64 },

    /// Submit a new claim
    Submit(SubmitArgs),

    /// List the claim types offered on the submission form
    ClaimTypes,

    /// Approve a claim with a response to the customer
    Approve {
        id: i64,
        #[arg(long, default_value = "")]
        note: String,
    },

    /// Reject a claim with a response to the customer
    Reject {
        id: i64,
        #[arg(long, default_value = "")]
        note: String,
    },

    /// Set a claim's status to APPROVED or REJECTED
    Decide {
        id: i64,
        status: String,
        #[arg(long, default_value = "")]
        note: String,
    },

    /// Delete one of your pending claims
    Delete { id: i64 },

    /// Mark a claim's description as verified
    Verify { id: i64 },

    /// Assign a claim to an agent
    Assign { id: i64, agent_id: i64 },

    // === Documents ===
    /// Attach a file to a claim
    Upload { claim_id: i64, file: PathBuf },

    /// List a claim's documents with their download URLs
    Documents { claim_id: i64 },

    // === Fraud ===
    /// Fraud analysis commands
    #[command(subcommand)]
    Fraud(FraudCommand),

    /// Admin report: claim totals and fraud statistics
    Reports,
}

#[derive(Subcommand, Debug)]
pub enum FraudCommand {
    /// Run the fraud scorer over a claim's image documents
    Analyze { claim_id: i64 },

    /// Show the stored fraud verdict for a claim
    #[command(name = "result")]
    Verdict { claim_id: i64 },

    /// Check whether the AI fraud service is reachable
    Health,

    /// Fraud verdict counts
    Stats,
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub email: String,

    /// Read from stdin when omitted
    #[arg(long)]
    pub password: Option<String>,

    /// CUSTOMER, AGENT or ADMIN
    #[arg(long, default_value = "CUSTOMER")]
    pub role: String,

    #[arg(long, default_value = "+91")]
    pub country_code: String,

    #[arg(long)]
    pub phone: String,

    /// 12 digits, spaces allowed
    #[arg(long)]
    pub aadhar: String,
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Defaults to the policy number on your account
    #[arg(long)]
    pub policy: Option<String>,

    /// Claim type id (see `claim-types`)
    #[arg(long = "type")]
    pub claim_type: String,

    #[arg(long)]
    pub amount: String,

    #[arg(long)]
    pub description: String,

    /// Supporting documents to attach after the claim is created
    #[arg(long = "file")]
    pub files: Vec<PathBuf>,
}

impl Command {
    /// The view this command corresponds to; the guard decides on it.
    pub fn route(&self) -> Route {
        match self {
            Command::Login { .. } => Route::Login,
            Command::Register(_) => Route::Register,
            Command::Logout | Command::Whoami => Route::Home,
            Command::Dashboard => Route::Dashboard,
            Command::Submit(_) => Route::NewClaim,
            Command::Reports => Route::Reports,
            _ => Route::Claims,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("claims-portal").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn commands_map_to_routes() {
        assert_eq!(parse(&["login", "a@b.c"]).command.route(), Route::Login);
        assert_eq!(
            parse(&["submit", "--type", "1", "--amount", "10", "--description", "x"])
                .command
                .route(),
            Route::NewClaim
        );
        assert_eq!(parse(&["reports"]).command.route(), Route::Reports);
        assert_eq!(parse(&["approve", "4"]).command.route(), Route::Claims);
        assert_eq!(parse(&["fraud", "health"]).command.route(), Route::Claims);
    }

    #[test]
    fn global_flags_and_defaults() {
        let cli = parse(&["claims", "--json", "--api-url", "http://h/api"]);
        assert!(cli.json);
        assert_eq!(cli.api_url.as_deref(), Some("http://h/api"));
        let Command::Claims { status, watch, .. } = cli.command else {
            panic!("expected claims");
        };
        assert_eq!(status, "ALL");
        assert_eq!(watch, None);
    }

    #[test]
    fn submit_collects_files() {
        let cli = parse(&[
            "submit", "--type", "2", "--amount", "15000.50", "--description", "Roof",
            "--file", "a.jpg", "--file", "b.pdf",
        ]);
        let Command::Submit(args) = cli.command else {
            panic!("expected submit");
        };
        assert_eq!(args.files.len(), 2);
        assert_eq!(args.policy, None);
    }
}

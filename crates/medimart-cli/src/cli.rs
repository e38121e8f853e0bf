use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "medimart")]
#[command(about = "MediMart CLI: doctors, bookings and orders from the terminal")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Server base URL (overrides config and MEDIMART_URL env var)
    #[arg(short, long, global = true, env = "MEDIMART_URL")]
    pub server: Option<String>,

    /// Config profile name
    #[arg(short, long, global = true, env = "MEDIMART_PROFILE", default_value = "default")]
    pub profile: String,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl OutputFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(raw, true).ok()
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the issued token
    Login(LoginArgs),
    /// Remove stored credentials
    Logout,
    /// Show who the stored token belongs to
    Whoami,
    /// Check server health
    Status,
    /// List doctors
    Doctors(DoctorsArgs),
    /// Show open slots of a doctor on a date
    Slots(SlotsArgs),
    /// Book a consultation
    Book(BookArgs),
    /// List bookings of a patient or doctor
    Bookings(BookingsArgs),
    /// List orders of a buyer or retailer
    Orders(OrdersArgs),
    /// Search doctors, products and blog posts
    Search(SearchArgs),
    /// Manage CLI configuration
    Config(ConfigArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Role {
    Patient,
    Doctor,
    Retailer,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Retailer => "retailer",
            Role::Admin => "admin",
        }
    }
}

#[derive(clap::Args)]
pub struct LoginArgs {
    #[arg(short, long)]
    pub email: String,
    #[arg(long, env = "MEDIMART_PASSWORD")]
    pub password: String,
    #[arg(short, long, default_value = "patient")]
    pub role: Role,
}

#[derive(clap::Args)]
pub struct DoctorsArgs {
    /// Exact specialization, case-insensitive
    #[arg(long)]
    pub specialization: Option<String>,
    /// Name substring
    #[arg(short, long)]
    pub query: Option<String>,
    /// Include directory entries that have no account
    #[arg(long)]
    pub all: bool,
}

#[derive(clap::Args)]
pub struct SlotsArgs {
    pub doctor_id: String,
    /// YYYY-MM-DD, defaults to today on the server
    #[arg(short, long)]
    pub date: Option<String>,
}

#[derive(clap::Args)]
pub struct BookArgs {
    pub doctor_id: String,
    /// YYYY-MM-DD
    #[arg(short, long)]
    pub date: String,
    /// HH:MM
    #[arg(short = 't', long)]
    pub slot: String,
    /// Defaults to the logged-in patient
    #[arg(long)]
    pub patient: Option<String>,
    #[arg(long)]
    pub reason: Option<String>,
}

#[derive(clap::Args)]
pub struct BookingsArgs {
    /// List a doctor's bookings instead of a patient's
    #[arg(long, conflicts_with = "patient")]
    pub doctor: Option<String>,
    /// Defaults to the logged-in user
    #[arg(long)]
    pub patient: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
}

#[derive(clap::Args)]
pub struct OrdersArgs {
    /// List a retailer's orders instead of a buyer's
    #[arg(long, conflicts_with = "buyer")]
    pub retailer: Option<String>,
    /// Defaults to the logged-in user
    #[arg(long)]
    pub buyer: Option<String>,
    /// Only with --retailer
    #[arg(long, requires = "retailer")]
    pub status: Option<String>,
}

#[derive(clap::Args)]
pub struct SearchArgs {
    pub query: String,
    /// doctors, products or blogs
    #[arg(short = 'k', long = "type")]
    pub kind: Option<String>,
    #[arg(short, long)]
    pub limit: Option<u32>,
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current config
    Show,
    /// Set config value
    Set(ConfigSetArgs),
}

#[derive(clap::Args)]
pub struct ConfigSetArgs {
    /// Key to set (server, format)
    pub key: String,
    /// Value
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_book_command() {
        let cli = Cli::try_parse_from([
            "medimart", "--server", "http://localhost:5000", "book", "doc-1", "-d", "2030-01-02",
            "-t", "10:30",
        ])
        .unwrap();
        assert_eq!(cli.server.as_deref(), Some("http://localhost:5000"));
        match cli.command {
            Commands::Book(args) => {
                assert_eq!(args.doctor_id, "doc-1");
                assert_eq!(args.date, "2030-01-02");
                assert_eq!(args.slot, "10:30");
                assert!(args.patient.is_none());
            }
            _ => panic!("expected book"),
        }
    }

    #[test]
    fn order_status_needs_retailer() {
        assert!(Cli::try_parse_from(["medimart", "orders", "--status", "placed"]).is_err());
        assert!(
            Cli::try_parse_from(["medimart", "orders", "--retailer", "r1", "--status", "placed"])
                .is_ok()
        );
    }

    #[test]
    fn format_names() {
        assert_eq!(OutputFormat::parse("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("table"), Some(OutputFormat::Table));
        assert_eq!(OutputFormat::parse("yaml"), None);
    }
}
